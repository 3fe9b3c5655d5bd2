//! Game rules.
//!
//! Every function here works on a `&mut GameSession` that the caller owns
//! for the duration of one transaction. An `Err` means the caller must
//! discard that session; nothing is rolled back in place.
//!
//! - `context`: per-transaction bundle of catalog, config, clock and chooser
//! - `actions`: player actions (play, cast, attack, heal, deck submission)
//! - `turn`: game start and the end-of-turn sequence

pub mod actions;
pub mod context;
pub mod turn;

pub use actions::{
    attack_creature_with_creature, attack_player_with_creature, available_attackers, cast_spell,
    heal_creatures, play_card, playable_cards, prepare_rematch, submit_deck,
};
pub use context::RuleContext;
pub use turn::{end_turn, materialize_deck, start_game};
