//! Trigger dispatch.
//!
//! Fires the triggered abilities of battlefield permanents for one event.
//! Each ability runs as its own invocation against a fresh snapshot, so a
//! failing ability only loses its own operations and never blocks the next.

use serde::{Deserialize, Serialize};

use crate::cards::TriggerEvent;
use crate::core::{GameSession, InstanceId, LogAction, PlayerId};
use crate::effects::{apply_operations, sweep_destroyed, Invocation, InvocationOutcome, Target};
use crate::rules::RuleContext;

/// Details of the damage event that fired a trigger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerContext {
    /// Who dealt the damage.
    pub damage_source: Option<Target>,

    /// Who took the damage.
    pub damage_target: Option<Target>,

    pub damage_amount: i64,
}

impl TriggerContext {
    #[must_use]
    pub fn damage(source: Option<Target>, target: Option<Target>, amount: i64) -> Self {
        Self {
            damage_source: source,
            damage_target: target,
            damage_amount: amount,
        }
    }
}

/// Counts from one dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerReport {
    pub fired: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for TriggerReport {
    fn add_assign(&mut self, other: Self) {
        self.fired += other.fired;
        self.failed += other.failed;
    }
}

/// Fire `event` for every permanent on `player`'s battlefield.
///
/// Iterates a snapshot of the battlefield in insertion order. Instances that
/// leave play mid-pass are skipped, and the pass stops once the game ends.
pub async fn execute_triggered_abilities(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    event: TriggerEvent,
    player: PlayerId,
) -> TriggerReport {
    let mut report = TriggerReport::default();
    for instance in session.battlefield(player) {
        if session.is_finished() {
            break;
        }
        report +=
            execute_triggered_abilities_for_creature(session, ctx, event, player, instance, None)
                .await;
    }
    report
}

/// Fire `event` for one permanent, passing `context` to its scripts.
pub async fn execute_triggered_abilities_for_creature(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    event: TriggerEvent,
    player: PlayerId,
    instance: InstanceId,
    context: Option<TriggerContext>,
) -> TriggerReport {
    let mut report = TriggerReport::default();

    let Some(card) = session.instance(instance) else {
        return report;
    };
    if card.owner != player {
        return report;
    }
    let Some(definition) = ctx.catalog.get(card.card_id).cloned() else {
        tracing::warn!(
            instance = %instance,
            card = %card.card_id,
            "No definition for triggered card"
        );
        return report;
    };

    for ability in definition.abilities_for(event) {
        if session.is_finished() || !session.is_on_battlefield(instance) {
            break;
        }

        let label = format!("{}: {}", definition.name, ability.description);
        let invocation = Invocation::ability(player, instance, label.clone(), context);
        let snapshot = session.clone();
        let outcome = ctx
            .interpreter
            .invoke(&ability.effect, &snapshot, ctx.catalog, ctx.chooser, &invocation)
            .await;

        let now = ctx.now();
        match outcome {
            InvocationOutcome::Completed(ops) => {
                tracing::debug!(%event, instance = %instance, ops = ops.len(), "Ability fired");
                session.log(player, LogAction::Ability, label, now);
                apply_operations(session, &ops, now);
                sweep_destroyed(session, ctx.catalog, now);
                report.fired += 1;
            }
            InvocationOutcome::Declined | InvocationOutcome::Failed(_) => {
                session.log(player, LogAction::AbilityFailed, format!("{label} failed"), now);
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, CardId, CardRegistry, TriggeredAbility};
    use crate::core::{EngineConfig, GameStatus, ManualClock};
    use crate::effects::{Expr, FirstTargetChooser, Script, Stmt};
    use crate::zones::{Zone, ZonePosition};

    fn pinger(id: u32, name: &str, damage: i64) -> CardDefinition {
        CardDefinition::creature(CardId::new(id), name, 1, 1, 1).with_ability(TriggeredAbility::new(
            TriggerEvent::StartTurn,
            "Ping",
            Script::new(vec![Stmt::damage_player(Expr::Opponent, damage)]),
        ))
    }

    fn broken(id: u32) -> CardDefinition {
        CardDefinition::creature(CardId::new(id), "Broken", 1, 1, 1).with_ability(
            TriggeredAbility::new(
                TriggerEvent::StartTurn,
                "Explode",
                Script::new(vec![
                    Stmt::damage_player(Expr::Opponent, 5),
                    Stmt::Fail("oops".into()),
                ]),
            ),
        )
    }

    fn setup(defs: &[CardDefinition]) -> (GameSession, CardRegistry, Vec<InstanceId>) {
        let mut catalog = CardRegistry::new();
        let mut session = GameSession::new(["Alice", "Bob"], &EngineConfig::default()).unwrap();
        session.status = GameStatus::Playing;
        let mut ids = Vec::new();
        for def in defs {
            catalog.register(def.clone());
            ids.push(
                session
                    .create_instance(PlayerId::new(0), def, Zone::Battlefield, ZonePosition::Top)
                    .unwrap(),
            );
        }
        (session, catalog, ids)
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let (mut session, catalog, _) = setup(&[broken(1), pinger(2, "Imp", 2)]);
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);

        let report = execute_triggered_abilities(
            &mut session,
            &ctx,
            TriggerEvent::StartTurn,
            PlayerId::new(0),
        )
        .await;

        assert_eq!(report, TriggerReport { fired: 1, failed: 1 });
        // Only the working ability's damage landed
        assert_eq!(session.players[PlayerId::new(1)].health, 28);
        let texts: Vec<_> = session.log.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(texts, vec!["Broken: Explode failed", "Imp: Ping"]);
    }

    #[tokio::test]
    async fn test_stops_when_game_ends() {
        let (mut session, catalog, _) = setup(&[pinger(1, "Big", 30), pinger(2, "Small", 1)]);
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);

        let report = execute_triggered_abilities(
            &mut session,
            &ctx,
            TriggerEvent::StartTurn,
            PlayerId::new(0),
        )
        .await;

        assert_eq!(report.fired, 1);
        assert!(session.is_finished());
        assert_eq!(session.count_log(LogAction::GameEnd), 1);
    }

    #[tokio::test]
    async fn test_wrong_owner_or_event_does_nothing() {
        let (mut session, catalog, ids) = setup(&[pinger(1, "Imp", 2)]);
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);

        let report = execute_triggered_abilities_for_creature(
            &mut session,
            &ctx,
            TriggerEvent::StartTurn,
            PlayerId::new(1),
            ids[0],
            None,
        )
        .await;
        assert_eq!(report, TriggerReport::default());

        let report = execute_triggered_abilities(
            &mut session,
            &ctx,
            TriggerEvent::EndTurn,
            PlayerId::new(0),
        )
        .await;
        assert_eq!(report, TriggerReport::default());
        assert!(session.log.is_empty());
    }
}
