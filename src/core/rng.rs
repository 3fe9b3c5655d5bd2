//! Deterministic random number generation for deck shuffles.
//!
//! The session stores only a `GameRngState` (seed + ChaCha8 word position) so
//! the document stays plain data. Rules code rebuilds a `GameRng` from that
//! state, draws from it, and writes the advanced state back.
//!
//! ```
//! use ccg_arena::core::GameRng;
//!
//! let mut a = GameRng::new(42);
//! let mut b = GameRng::from_state(&a.state());
//! assert_eq!(a.derive_seed(), b.derive_seed());
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Deterministic RNG backed by ChaCha8.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Derive a seed for a follow-up game (rematches).
    ///
    /// Mixes the current stream position into the seed so consecutive
    /// rematches do not replay the same shuffles.
    #[must_use]
    pub fn derive_seed(&mut self) -> u64 {
        self.seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(self.inner.gen::<u64>())
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }

    /// Get the current state for storage in the session document.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Restore from a saved state.
    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

/// Serializable RNG state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRngState {
    /// Original seed
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter)
    pub word_pos: u128,
}

impl GameRngState {
    /// State of a freshly seeded RNG.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self { seed, word_pos: 0 }
    }
}
