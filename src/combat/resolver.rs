//! Combat resolution.
//!
//! Sequence of one attack:
//!
//! 1. Sap the attacker and log the attack.
//! 2. `deal_damage` triggers for the attacker, and for the defender if it
//!    strikes back.
//! 3. `take_damage` triggers for the defender, and for the attacker if it is
//!    struck back.
//! 4. Attacker damage to the target, if the target is still in play.
//! 5. Counter damage to the attacker, if the attacker is still in play.
//!
//! Both damage amounts are read from the definitions before step 2, so a
//! defender destroyed by the first strike still strikes back. Lethal damage
//! is swept to the graveyard right after it is applied.

use crate::cards::TriggerEvent;
use crate::core::{EngineError, GameLogEntry, GameSession, InstanceId, LogAction, PlayerId};
use crate::effects::{apply_operations, sweep_destroyed, Operation, Target};
use crate::rules::RuleContext;
use crate::triggers::{execute_triggered_abilities_for_creature, TriggerContext};

/// Resolve `attacker` attacking the enemy player `target`.
///
/// Legality (turn, ownership, sapped, targeting rules) is checked by the
/// caller.
pub async fn attack_player(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    attacker: InstanceId,
    target: PlayerId,
) -> Result<(), EngineError> {
    let attacker_def = ctx.definition(session, attacker)?;
    let owner = session.require_instance(attacker)?.owner;
    let attacker_target = ctx.target_of(session, attacker);
    let defender_target = Target::Player(target);
    let damage = attacker_def.attack;

    sap(session, attacker)?;
    let defender_name = session.player(target)?.name.clone();
    session.push_log(
        GameLogEntry::new(
            owner,
            LogAction::Attack,
            format!("{} attacks {}", attacker_def.name, defender_name),
            ctx.now(),
        )
        .with_amount(damage)
        .with_target(defender_target),
    );

    let strike = TriggerContext::damage(attacker_target, Some(defender_target), damage);
    execute_triggered_abilities_for_creature(
        session,
        ctx,
        TriggerEvent::DealDamage,
        owner,
        attacker,
        Some(strike),
    )
    .await;
    if session.is_finished() {
        return Ok(());
    }

    let now = ctx.now();
    let dealt = session.damage_player(target, damage, now)?;
    session.push_log(
        GameLogEntry::new(
            owner,
            LogAction::Damage,
            format!("{} deals {} damage to {}", attacker_def.name, dealt, defender_name),
            now,
        )
        .with_amount(dealt)
        .with_target(defender_target),
    );
    tracing::debug!(attacker = %attacker, target = %target, damage = dealt, "Player attacked");
    Ok(())
}

/// Resolve `attacker` attacking the enemy permanent `defender`.
pub async fn attack_creature(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    attacker: InstanceId,
    defender: InstanceId,
) -> Result<(), EngineError> {
    let attacker_def = ctx.definition(session, attacker)?;
    let defender_def = ctx.definition(session, defender)?;
    let owner = session.require_instance(attacker)?.owner;
    let defender_owner = session.require_instance(defender)?.owner;
    let attacker_target = ctx.target_of(session, attacker);
    let defender_target = ctx.target_of(session, defender);

    let damage = attacker_def.attack;
    let counter = defender_def.can_counter().then_some(defender_def.attack);

    sap(session, attacker)?;
    let mut entry = GameLogEntry::new(
        owner,
        LogAction::Attack,
        format!("{} attacks {}", attacker_def.name, defender_def.name),
        ctx.now(),
    )
    .with_amount(damage);
    if let Some(target) = defender_target {
        entry = entry.with_target(target);
    }
    session.push_log(entry);

    let strike = TriggerContext::damage(attacker_target, defender_target, damage);
    let riposte =
        counter.map(|amount| TriggerContext::damage(defender_target, attacker_target, amount));

    execute_triggered_abilities_for_creature(
        session,
        ctx,
        TriggerEvent::DealDamage,
        owner,
        attacker,
        Some(strike),
    )
    .await;
    if let Some(riposte) = riposte {
        execute_triggered_abilities_for_creature(
            session,
            ctx,
            TriggerEvent::DealDamage,
            defender_owner,
            defender,
            Some(riposte),
        )
        .await;
    }
    execute_triggered_abilities_for_creature(
        session,
        ctx,
        TriggerEvent::TakeDamage,
        defender_owner,
        defender,
        Some(strike),
    )
    .await;
    if let Some(riposte) = riposte {
        execute_triggered_abilities_for_creature(
            session,
            ctx,
            TriggerEvent::TakeDamage,
            owner,
            attacker,
            Some(riposte),
        )
        .await;
    }
    if session.is_finished() {
        return Ok(());
    }

    strike_creature(session, ctx, owner, &attacker_def.name, defender, damage);
    if let Some(amount) = counter {
        strike_creature(session, ctx, defender_owner, &defender_def.name, attacker, amount);
    }
    tracing::debug!(
        attacker = %attacker,
        defender = %defender,
        damage,
        ?counter,
        "Creature attacked"
    );
    Ok(())
}

fn sap(session: &mut GameSession, attacker: InstanceId) -> Result<(), EngineError> {
    session
        .instance_mut(attacker)
        .ok_or(EngineError::UnknownInstance(attacker))?
        .sap();
    Ok(())
}

/// Deal combat damage to a permanent still in play, then sweep.
fn strike_creature(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    by: PlayerId,
    source_name: &str,
    victim: InstanceId,
    amount: i64,
) {
    if !session.is_on_battlefield(victim) {
        return;
    }
    let now = ctx.now();
    let victim_name = ctx.card_name(session, victim);
    let mut entry = GameLogEntry::new(
        by,
        LogAction::Damage,
        format!("{source_name} deals {amount} damage to {victim_name}"),
        now,
    )
    .with_amount(amount);
    if let Some(target) = ctx.target_of(session, victim) {
        entry = entry.with_target(target);
    }
    session.push_log(entry);

    apply_operations(session, &[Operation::DamageCreature { instance: victim, amount }], now);
    sweep_destroyed(session, ctx.catalog, now);
}
