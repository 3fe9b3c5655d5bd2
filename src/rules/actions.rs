//! Player actions.
//!
//! Each function validates its preconditions, then mutates the session it is
//! given. On `Err` the caller throws the session away, so validation may
//! happen in any order relative to mutation as long as nothing external is
//! touched.

use crate::cards::{CardDefinition, CardId, CardKind, CardRegistry, TriggerEvent};
use crate::combat;
use crate::core::{
    CatalogError, EngineConfig, EngineError, GameLogEntry, GameRng, GameRngState, GameSession,
    GameStatus, InstanceId, LogAction, PlayerId,
};
use crate::effects::{
    apply_operations, sweep_destroyed, validate_target, Invocation, InvocationOutcome, Target,
    TargetSelector,
};
use crate::triggers::execute_triggered_abilities_for_creature;
use crate::zones::Zone;

use super::context::RuleContext;
use super::turn;

/// Play a card from hand.
///
/// Creatures and artifacts go to the battlefield at full health (creatures
/// sapped) and fire their `play_card` abilities. Spells are cast.
pub async fn play_card(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    player: PlayerId,
    instance: InstanceId,
) -> Result<(), EngineError> {
    session.require_turn(player)?;
    session.require_owned_in(player, instance, Zone::Hand)?;
    let definition = ctx.definition(session, instance)?;
    if definition.kind == CardKind::Spell {
        return cast_spell(session, ctx, player, instance).await;
    }

    session.player_mut(player)?.spend_energy(definition.cost)?;
    session.move_instance(instance, Zone::Hand, Zone::Battlefield)?;
    let card = session
        .instance_mut(instance)
        .ok_or(EngineError::UnknownInstance(instance))?;
    card.current_health = definition.health;
    card.sapped = definition.kind == CardKind::Creature;

    let name = session.player(player)?.name.clone();
    let mut entry = GameLogEntry::new(
        player,
        LogAction::PlayCard,
        format!("{name} plays {}", definition.name),
        ctx.now(),
    )
    .with_amount(definition.cost);
    if let Some(target) = ctx.target_of(session, instance) {
        entry = entry.with_target(target);
    }
    session.push_log(entry);
    tracing::debug!(player = %player, instance = %instance, card = %definition.id, "Card played");

    execute_triggered_abilities_for_creature(
        session,
        ctx,
        TriggerEvent::PlayCard,
        player,
        instance,
        None,
    )
    .await;
    Ok(())
}

/// Cast a spell from hand.
///
/// The spell script runs first. Only if it completes is the cost paid, the
/// spell moved to the graveyard and its operations applied.
pub async fn cast_spell(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    player: PlayerId,
    instance: InstanceId,
) -> Result<(), EngineError> {
    session.require_turn(player)?;
    session.require_owned_in(player, instance, Zone::Hand)?;
    let definition = ctx.definition(session, instance)?;
    if definition.kind != CardKind::Spell {
        return Err(EngineError::WrongKind {
            instance,
            kind: definition.kind,
            action: "be cast",
        });
    }
    let available = session.player(player)?.energy;
    if definition.cost > available {
        return Err(EngineError::InsufficientEnergy {
            needed: definition.cost,
            available,
        });
    }
    let script = definition
        .spell_effect
        .as_ref()
        .ok_or_else(|| {
            CatalogError::Invalid(format!("{} is a spell without an effect", definition.name))
        })?;

    let invocation = Invocation::spell(player, instance, definition.name.clone());
    let snapshot = session.clone();
    let ops = match ctx
        .interpreter
        .invoke(script, &snapshot, ctx.catalog, ctx.chooser, &invocation)
        .await
    {
        InvocationOutcome::Completed(ops) => ops,
        InvocationOutcome::Declined => {
            return Err(EngineError::EffectDeclined(definition.name.clone()))
        }
        InvocationOutcome::Failed(source) => {
            return Err(EngineError::Effect {
                label: definition.name.clone(),
                source,
            })
        }
    };

    let now = ctx.now();
    session.player_mut(player)?.spend_energy(definition.cost)?;
    session.move_instance(instance, Zone::Hand, Zone::Graveyard)?;
    let name = session.player(player)?.name.clone();
    let description = format!("{name} casts {}", definition.name);
    session.push_log(
        GameLogEntry::new(player, LogAction::CastSpell, description, now)
            .with_amount(definition.cost),
    );
    apply_operations(session, &ops, now);
    sweep_destroyed(session, ctx.catalog, now);
    tracing::debug!(player = %player, spell = %definition.id, ops = ops.len(), "Spell cast");
    Ok(())
}

/// Attack an enemy player.
pub async fn attack_player_with_creature(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    player: PlayerId,
    attacker: InstanceId,
    target: PlayerId,
) -> Result<(), EngineError> {
    let definition = check_attacker(session, ctx, player, attacker)?;
    check_attack_target(session, ctx, player, definition, Target::Player(target))?;
    combat::attack_player(session, ctx, attacker, target).await
}

/// Attack an enemy creature or artifact.
pub async fn attack_creature_with_creature(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    player: PlayerId,
    attacker: InstanceId,
    defender: InstanceId,
) -> Result<(), EngineError> {
    let definition = check_attacker(session, ctx, player, attacker)?;
    let target = ctx
        .target_of(session, defender)
        .ok_or_else(|| EngineError::IllegalTarget(format!("{defender} cannot be attacked")))?;
    check_attack_target(session, ctx, player, definition, target)?;
    combat::attack_creature(session, ctx, attacker, defender).await
}

/// Permanents `player` can attack with right now.
#[must_use]
pub fn available_attackers(
    session: &GameSession,
    catalog: &CardRegistry,
    player: PlayerId,
) -> Vec<InstanceId> {
    if session.require_turn(player).is_err() {
        return Vec::new();
    }
    session
        .battlefield(player)
        .into_iter()
        .filter(|&id| {
            session.instance(id).is_some_and(|card| {
                !card.sapped
                    && catalog
                        .get(card.card_id)
                        .is_some_and(|def| def.kind == CardKind::Creature)
            })
        })
        .collect()
}

/// Cards in `player`'s hand they can afford right now.
#[must_use]
pub fn playable_cards(
    session: &GameSession,
    catalog: &CardRegistry,
    player: PlayerId,
) -> Vec<InstanceId> {
    let Ok(state) = session.player(player) else {
        return Vec::new();
    };
    if session.require_turn(player).is_err() {
        return Vec::new();
    }
    state
        .zones
        .cards(Zone::Hand)
        .iter()
        .copied()
        .filter(|&id| {
            session
                .instance(id)
                .and_then(|card| catalog.get(card.card_id))
                .is_some_and(|def| def.cost <= state.energy)
        })
        .collect()
}

/// Heal every creature `player` controls by `amount`.
pub fn heal_creatures(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    player: PlayerId,
    amount: i64,
) -> Result<(), EngineError> {
    session.require_status(GameStatus::Playing)?;
    if amount < 0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    let name = session.player(player)?.name.clone();
    let healed = turn::heal_creatures(session, ctx.catalog, player, amount);
    let description = format!("{name}'s creatures heal {healed}");
    session.push_log(
        GameLogEntry::new(player, LogAction::Heal, description, ctx.now()).with_amount(healed),
    );
    Ok(())
}

/// Record `player`'s deck. Returns true once every seat has a deck.
pub fn submit_deck(
    session: &mut GameSession,
    catalog: &CardRegistry,
    player: PlayerId,
    deck: &[CardId],
) -> Result<bool, EngineError> {
    session.require_status(GameStatus::Waiting)?;
    if !session.player(player)?.deck_list.is_empty() {
        return Err(EngineError::DeckAlreadySet(player));
    }
    if deck.is_empty() {
        return Err(EngineError::EmptyDeck);
    }
    for &card in deck {
        catalog.require(card)?.validate()?;
    }

    session.player_mut(player)?.deck_list = deck.to_vec();
    tracing::debug!(player = %player, cards = deck.len(), "Deck submitted");
    Ok(session.players.iter().all(|(_, p)| !p.deck_list.is_empty()))
}

/// Build the waiting session of a rematch of the finished `previous` game.
///
/// Same players and decks, fresh state, the other seat goes first. Returns
/// the new session and its starting player.
pub fn prepare_rematch(
    previous: &GameSession,
    config: &EngineConfig,
) -> Result<(GameSession, PlayerId), EngineError> {
    previous.require_status(GameStatus::Finished)?;

    let names: Vec<_> = previous.players.iter().map(|(_, p)| p.name.clone()).collect();
    let mut next = GameSession::new(names, config)?;
    for (id, player) in previous.players.iter() {
        next.player_mut(id)?.deck_list = player.deck_list.clone();
    }
    next.rng = GameRngState::seeded(GameRng::from_state(&previous.rng).derive_seed());

    let (starting, _) = previous.players.next_seat(previous.starting_player);
    Ok((next, starting))
}

fn check_attacker<'a>(
    session: &GameSession,
    ctx: &RuleContext<'a>,
    player: PlayerId,
    attacker: InstanceId,
) -> Result<&'a CardDefinition, EngineError> {
    session.require_turn(player)?;
    let card = session.require_owned_in(player, attacker, Zone::Battlefield)?;
    let definition = ctx.definition(session, attacker)?;
    if definition.kind != CardKind::Creature {
        return Err(EngineError::WrongKind {
            instance: attacker,
            kind: definition.kind,
            action: "attack",
        });
    }
    if card.sapped {
        return Err(EngineError::Sapped(attacker));
    }
    Ok(definition)
}

fn check_attack_target(
    session: &GameSession,
    ctx: &RuleContext<'_>,
    player: PlayerId,
    attacker: &CardDefinition,
    target: Target,
) -> Result<(), EngineError> {
    let selector = TargetSelector::for_attack(&attacker.attack_targeting);
    if !validate_target(&selector, session, ctx.catalog, player, target) {
        return Err(EngineError::IllegalTarget(format!(
            "{} cannot attack {target:?}",
            attacker.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::AttackTargeting;
    use crate::core::ManualClock;
    use crate::effects::{Expr, FirstTargetChooser, Script, Stmt};
    use crate::zones::ZonePosition;

    const WOLF: CardId = CardId::new(1);
    const TOTEM: CardId = CardId::new(2);
    const BOLT: CardId = CardId::new(3);
    const DUD: CardId = CardId::new(4);
    const WALL_BREAKER: CardId = CardId::new(5);

    fn catalog() -> CardRegistry {
        let mut catalog = CardRegistry::new();
        catalog.register(CardDefinition::creature(WOLF, "Wolf", 2, 3, 2));
        catalog.register(CardDefinition::artifact(TOTEM, "Totem", 1, 4));
        catalog.register(CardDefinition::spell(
            BOLT,
            "Bolt",
            1,
            Script::new(vec![Stmt::damage_player(Expr::Opponent, 3)]),
        ));
        catalog.register(CardDefinition::spell(
            DUD,
            "Dud",
            1,
            Script::new(vec![
                Stmt::damage_player(Expr::Opponent, 3),
                Stmt::Return(Expr::Bool(false)),
            ]),
        ));
        catalog.register(
            CardDefinition::creature(WALL_BREAKER, "Wall Breaker", 1, 2, 2).with_attack_targeting(
                AttackTargeting {
                    can_target_players: false,
                    can_target_creatures: false,
                    can_target_artifacts: true,
                },
            ),
        );
        catalog
    }

    fn playing(energy: i64) -> GameSession {
        let mut session = GameSession::new(["Alice", "Bob"], &EngineConfig::default()).unwrap();
        session.status = GameStatus::Playing;
        for (_, player) in session.players.iter_mut() {
            player.max_energy = energy;
            player.energy = energy;
        }
        session
    }

    fn give(
        session: &mut GameSession,
        catalog: &CardRegistry,
        owner: u8,
        card: CardId,
        zone: Zone,
    ) -> InstanceId {
        let def = catalog.get(card).unwrap().clone();
        session
            .create_instance(PlayerId::new(owner), &def, zone, ZonePosition::Top)
            .unwrap()
    }

    #[tokio::test]
    async fn test_play_creature() {
        let catalog = catalog();
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);
        let mut session = playing(5);
        let wolf = give(&mut session, &catalog, 0, WOLF, Zone::Hand);

        play_card(&mut session, &ctx, PlayerId::new(0), wolf).await.unwrap();

        assert_eq!(session.zone_of(wolf), Some(Zone::Battlefield));
        assert_eq!(session.players[PlayerId::new(0)].energy, 3);
        assert!(session.instance(wolf).unwrap().sapped);
    }

    #[tokio::test]
    async fn test_play_card_validation() {
        let catalog = catalog();
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);
        let mut session = playing(1);
        let wolf = give(&mut session, &catalog, 0, WOLF, Zone::Hand);
        let theirs = give(&mut session, &catalog, 1, WOLF, Zone::Hand);

        assert!(matches!(
            play_card(&mut session, &ctx, PlayerId::new(0), wolf).await,
            Err(EngineError::InsufficientEnergy { needed: 2, available: 1 })
        ));
        assert!(matches!(
            play_card(&mut session, &ctx, PlayerId::new(1), theirs).await,
            Err(EngineError::NotYourTurn { .. })
        ));
        assert!(matches!(
            play_card(&mut session, &ctx, PlayerId::new(0), theirs).await,
            Err(EngineError::NotOwner { .. })
        ));
    }

    #[tokio::test]
    async fn test_cast_spell() {
        let catalog = catalog();
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);
        let mut session = playing(3);
        let bolt = give(&mut session, &catalog, 0, BOLT, Zone::Hand);

        play_card(&mut session, &ctx, PlayerId::new(0), bolt).await.unwrap();

        assert_eq!(session.zone_of(bolt), Some(Zone::Graveyard));
        assert_eq!(session.players[PlayerId::new(1)].health, 27);
        assert_eq!(session.players[PlayerId::new(0)].energy, 2);
        assert_eq!(session.count_log(LogAction::CastSpell), 1);
    }

    #[tokio::test]
    async fn test_declined_spell_leaves_state() {
        let catalog = catalog();
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);
        let mut session = playing(3);
        let dud = give(&mut session, &catalog, 0, DUD, Zone::Hand);
        let before = session.clone();

        let err = cast_spell(&mut session, &ctx, PlayerId::new(0), dud).await.unwrap_err();

        assert_eq!(err, EngineError::EffectDeclined("Dud".into()));
        assert_eq!(session, before);
    }

    #[tokio::test]
    async fn test_attack_rules() {
        let catalog = catalog();
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);
        let mut session = playing(3);
        let p0 = PlayerId::new(0);
        let breaker = give(&mut session, &catalog, 0, WALL_BREAKER, Zone::Battlefield);
        let own_wolf = give(&mut session, &catalog, 0, WOLF, Zone::Battlefield);
        let totem = give(&mut session, &catalog, 1, TOTEM, Zone::Battlefield);
        let own_totem = give(&mut session, &catalog, 0, TOTEM, Zone::Battlefield);

        assert!(matches!(
            attack_player_with_creature(&mut session, &ctx, p0, breaker, PlayerId::new(1)).await,
            Err(EngineError::IllegalTarget(_))
        ));
        assert!(matches!(
            attack_creature_with_creature(&mut session, &ctx, p0, own_wolf, own_totem).await,
            Err(EngineError::IllegalTarget(_))
        ));
        assert!(matches!(
            attack_creature_with_creature(&mut session, &ctx, p0, own_totem, totem).await,
            Err(EngineError::WrongKind { action: "attack", .. })
        ));

        attack_creature_with_creature(&mut session, &ctx, p0, breaker, totem).await.unwrap();
        assert_eq!(session.instance(totem).unwrap().current_health, 2);
        assert!(matches!(
            attack_creature_with_creature(&mut session, &ctx, p0, breaker, totem).await,
            Err(EngineError::Sapped(_))
        ));
        assert_eq!(available_attackers(&session, &catalog, p0), vec![own_wolf]);
    }

    #[test]
    fn test_playable_cards() {
        let catalog = catalog();
        let mut session = playing(1);
        give(&mut session, &catalog, 0, WOLF, Zone::Hand);
        let bolt = give(&mut session, &catalog, 0, BOLT, Zone::Hand);

        assert_eq!(playable_cards(&session, &catalog, PlayerId::new(0)), vec![bolt]);
        assert!(playable_cards(&session, &catalog, PlayerId::new(1)).is_empty());
    }

    #[test]
    fn test_submit_deck() {
        let catalog = catalog();
        let mut session = GameSession::new(["Alice", "Bob"], &EngineConfig::default()).unwrap();

        assert_eq!(
            submit_deck(&mut session, &catalog, PlayerId::new(0), &[]),
            Err(EngineError::EmptyDeck)
        );
        assert_eq!(submit_deck(&mut session, &catalog, PlayerId::new(0), &[WOLF, BOLT]), Ok(false));
        assert_eq!(
            submit_deck(&mut session, &catalog, PlayerId::new(0), &[WOLF]),
            Err(EngineError::DeckAlreadySet(PlayerId::new(0)))
        );
        assert!(matches!(
            submit_deck(&mut session, &catalog, PlayerId::new(1), &[CardId::new(77)]),
            Err(EngineError::Catalog(CatalogError::UnknownCard(_)))
        ));
        assert_eq!(submit_deck(&mut session, &catalog, PlayerId::new(1), &[TOTEM]), Ok(true));
    }

    #[test]
    fn test_prepare_rematch() {
        let config = EngineConfig::default();
        let mut previous = playing(3);
        previous.players[PlayerId::new(0)].deck_list = vec![WOLF];
        previous.players[PlayerId::new(1)].deck_list = vec![TOTEM];
        assert!(prepare_rematch(&previous, &config).is_err());

        previous.finish(PlayerId::new(1), 0);
        let (next, starting) = prepare_rematch(&previous, &config).unwrap();

        assert_eq!(starting, PlayerId::new(1));
        assert_eq!(next.status, GameStatus::Waiting);
        assert_eq!(next.players[PlayerId::new(1)].deck_list, vec![TOTEM]);
        assert_eq!(next.players[PlayerId::new(0)].health, 30);
        assert!(next.log.is_empty());
    }
}
