//! Turn controller: game start and the end-of-turn sequence.
//!
//! ## Game start
//!
//! Materialize every deck, shuffle, draw opening hands, mark the session
//! `Playing`, log `game_start`, then fire `start_turn` for the first player.
//!
//! ## End of turn
//!
//! 1. Log `end_turn` and fire `end_turn` triggers for the current player
//! 2. Advance the active seat; wrapping to seat 0 increments `turn`
//! 3. Fire `start_turn` triggers for the new player
//! 4. New player draws, un-saps, and their creatures regenerate
//! 5. Energy refills; on wrap every player first gains max energy
//!
//! Every step checks for a finished game and stops there.

use crate::cards::{CardId, CardKind, CardRegistry, TriggerEvent};
use crate::core::{EngineError, GameSession, GameStatus, LogAction, PlayerId};
use crate::triggers::execute_triggered_abilities;
use crate::zones::{Zone, ZonePosition};

use super::context::RuleContext;

/// Create one deck instance per entry of `deck`, in order (last entry on top).
pub fn materialize_deck(
    session: &mut GameSession,
    catalog: &CardRegistry,
    player: PlayerId,
    deck: &[CardId],
) -> Result<(), EngineError> {
    for &card in deck {
        let definition = catalog.require(card)?;
        session.create_instance(player, definition, Zone::Deck, ZonePosition::Top)?;
    }
    Ok(())
}

/// Start a waiting session with `starting_player` to act first.
///
/// Every player's `deck_list` must already be set.
pub async fn start_game(
    session: &mut GameSession,
    ctx: &RuleContext<'_>,
    starting_player: PlayerId,
) -> Result<(), EngineError> {
    session.require_status(GameStatus::Waiting)?;
    session.player(starting_player)?;

    let players: Vec<_> = session.players.player_ids().collect();
    for &player in &players {
        let deck = session.player(player)?.deck_list.clone();
        if deck.is_empty() {
            return Err(EngineError::EmptyDeck);
        }
        materialize_deck(session, ctx.catalog, player, &deck)?;
        session.shuffle_deck(player)?;
    }

    let now = ctx.now();
    for &player in &players {
        for _ in 0..ctx.config.starting_hand_size {
            session.draw_card(player, now)?;
        }
    }

    session.status = GameStatus::Playing;
    session.current_player = starting_player;
    session.starting_player = starting_player;
    session.turn = 1;
    let name = session.player(starting_player)?.name.clone();
    let description = format!("Game started, {name} goes first");
    session.log(starting_player, LogAction::GameStart, description, now);
    tracing::info!(starting = %starting_player, players = players.len(), "Game started");

    execute_triggered_abilities(session, ctx, TriggerEvent::StartTurn, starting_player).await;
    Ok(())
}

/// End the current player's turn and start the next one.
pub async fn end_turn(session: &mut GameSession, ctx: &RuleContext<'_>) -> Result<(), EngineError> {
    session.require_status(GameStatus::Playing)?;
    let current = session.current_player;

    let name = session.player(current)?.name.clone();
    session.log(current, LogAction::EndTurn, format!("{name} ends their turn"), ctx.now());
    execute_triggered_abilities(session, ctx, TriggerEvent::EndTurn, current).await;
    if session.is_finished() {
        return Ok(());
    }

    let (next, wrapped) = session.players.next_seat(current);
    session.current_player = next;
    if wrapped {
        session.turn += 1;
    }
    let name = session.player(next)?.name.clone();
    let description = format!("Turn {}: {name}'s turn", session.turn);
    session.log(next, LogAction::StartTurn, description, ctx.now());
    tracing::debug!(player = %next, turn = session.turn, "Turn started");

    execute_triggered_abilities(session, ctx, TriggerEvent::StartTurn, next).await;
    if session.is_finished() {
        return Ok(());
    }

    session.draw_card(next, ctx.now())?;
    refresh_battlefield(session, next);
    heal_creatures(session, ctx.catalog, next, ctx.config.creature_regen_per_turn);

    if wrapped {
        let gain = ctx.config.energy_per_round;
        let cap = ctx.config.max_energy_cap;
        for (_, player) in session.players.iter_mut() {
            player.raise_max_energy(gain, cap);
            player.restore_energy();
        }
    } else {
        session.player_mut(next)?.restore_energy();
    }
    Ok(())
}

/// Un-sap every permanent on `player`'s battlefield.
pub fn refresh_battlefield(session: &mut GameSession, player: PlayerId) {
    for id in session.battlefield(player) {
        if let Some(card) = session.instance_mut(id) {
            card.refresh();
        }
    }
}

/// Heal `player`'s creatures by `amount`, capped at definition health.
///
/// Artifacts are not healed. Returns the total health restored.
pub fn heal_creatures(
    session: &mut GameSession,
    catalog: &CardRegistry,
    player: PlayerId,
    amount: i64,
) -> i64 {
    let mut healed = 0;
    for id in session.battlefield(player) {
        let Some(card) = session.instance_mut(id) else {
            continue;
        };
        let Some(definition) = catalog.get(card.card_id) else {
            continue;
        };
        if definition.kind == CardKind::Creature {
            healed += card.heal(amount, definition.health);
        }
    }
    healed
}
