//! Applies queued operations to the session.
//!
//! The applier never fails. Operations whose subject has gone away (a card
//! that left the battlefield, an unknown seat) are skipped. Once the game is
//! finished every remaining operation is skipped.
//!
//! Creature damage and destroy operations only bring health to zero. Callers
//! follow every `apply_operations` with `sweep_destroyed`, which moves dead
//! permanents to the graveyard and logs them. Reaching zero is final: later
//! operations in the same batch skip an instance that is already lethal.

use crate::cards::CardRegistry;
use crate::core::{GameLogEntry, GameSession, InstanceId, LogAction};

use super::operation::Operation;
use super::targeting::Target;

/// Outcome of one `apply_operations` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,

    /// Instances whose health reached zero.
    pub lethal: Vec<InstanceId>,
}

/// Apply `ops` in order.
pub fn apply_operations(session: &mut GameSession, ops: &[Operation], now: u64) -> ApplyReport {
    let mut report = ApplyReport::default();

    for op in ops {
        if session.is_finished() {
            report.skipped += 1;
            continue;
        }
        if apply_one(session, op, now, &mut report) {
            report.applied += 1;
        } else {
            tracing::debug!(?op, "Skipped operation");
            report.skipped += 1;
        }
    }
    report
}

fn apply_one(
    session: &mut GameSession,
    op: &Operation,
    now: u64,
    report: &mut ApplyReport,
) -> bool {
    if let Some(instance) = op.instance() {
        if report.lethal.contains(&instance) || !session.is_on_battlefield(instance) {
            return false;
        }
    }

    match *op {
        Operation::DamagePlayer { player, amount } => {
            session.damage_player(player, amount, now).is_ok()
        }
        Operation::HealPlayer { player, amount } => session.heal_player(player, amount).is_ok(),
        Operation::DamageCreature { instance, amount } => {
            let Some(card) = session.instance_mut(instance) else {
                return false;
            };
            if card.take_damage(amount) == 0 {
                report.lethal.push(instance);
            }
            true
        }
        Operation::HealCreature { instance, amount, max_health } => {
            match session.instance_mut(instance) {
                Some(card) => {
                    card.heal(amount, max_health);
                    true
                }
                None => false,
            }
        }
        Operation::DestroyCreature { instance } => {
            let Some(card) = session.instance_mut(instance) else {
                return false;
            };
            card.current_health = 0;
            report.lethal.push(instance);
            true
        }
        Operation::Log { player, ref description } => {
            session.log(player, LogAction::Effect, description.clone(), now);
            true
        }
        Operation::DrawCard { player } => session.draw_card(player, now).is_ok(),
        Operation::GainEnergy { player, amount } => {
            let Ok(state) = session.player_mut(player) else {
                return false;
            };
            let gained = state.gain_energy(amount);
            let entry = GameLogEntry::new(
                player,
                LogAction::GainEnergy,
                format!("{} gains {gained} energy", state.name),
                now,
            )
            .with_amount(gained);
            session.push_log(entry);
            true
        }
    }
}

/// Move every battlefield permanent at zero health to its owner's graveyard.
///
/// Returns the destroyed instances in battlefield order.
pub fn sweep_destroyed(
    session: &mut GameSession,
    catalog: &CardRegistry,
    now: u64,
) -> Vec<InstanceId> {
    let dead: Vec<_> = session
        .players
        .player_ids()
        .flat_map(|player| session.battlefield(player))
        .filter(|&id| session.instance(id).is_some_and(|card| card.is_dead()))
        .collect();

    for &id in &dead {
        let Some(card) = session.instance(id).cloned() else {
            continue;
        };
        if !session.destroy(id) {
            continue;
        }
        let name = catalog.get(card.card_id).map_or("Card", |def| def.name.as_str());
        let mut entry = GameLogEntry::new(
            card.owner,
            LogAction::Destroy,
            format!("{name} was destroyed"),
            now,
        );
        if let Some(kind) = catalog.get(card.card_id).map(|def| def.kind) {
            if let Some(target) = Target::card(kind, id, card.owner) {
                entry = entry.with_target(target);
            }
        }
        session.push_log(entry);
        tracing::debug!(instance = %id, owner = %card.owner, "Destroyed");
    }
    dead
}
