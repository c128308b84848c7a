// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Counter-keyed randomness for reproducible sampling.
//!
//! Every random decision the sampler makes is drawn from a sub-stream keyed by
//! a [`DrawKey`]. Sub-streams are pure functions of `(seed, subsequence, key)`,
//! so the same sample comes out no matter how many shards or workers produced
//! it, and no lock or shared counter is involved.
//!
//! # Key Derivation
//!
//! ```text
//! substream(key) = xoroshiro128+(splitmix(seed, subsequence, lineage, vertex, hop, draw))
//! ```
//!
//! `lineage` is the path context of the frontier entry being expanded: two
//! occurrences of the same vertex reached along different paths (or under
//! different labels) draw independently.

use crate::ident::Hop;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;
// 2^-53
const F64_UNIT: f64 = 1.0 / 9_007_199_254_740_992.0;
const SEED_LINEAGE_DOMAIN: u64 = 0x5eed_0000_0000_0000;

/// Identifies one random decision: draw `draw` made while expanding vertex
/// `vertex` at hop `hop` along path `lineage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawKey {
    /// Path context of the frontier entry.
    pub lineage: u64,
    /// Index of the vertex being expanded.
    pub vertex: u64,
    /// Hop index.
    pub hop: Hop,
    /// Draw index within the expansion.
    pub draw: u64,
}

/// An injected source of deterministic randomness.
///
/// Implementations must return the same sub-stream for the same key on every
/// call, from any thread.
pub trait RngStream: Sync {
    /// Returns the generator for one draw slot.
    fn substream(&self, key: DrawKey) -> Prng;
}

/// Caller-owned seeded stream, advanced by each sampling call.
///
/// A call snapshots the current `(seed, subsequence)` pair into a
/// [`CounterStream`] and then bumps `subsequence`, so consecutive calls on one
/// state produce different samples while equal states reproduce each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RngState {
    seed: u64,
    subsequence: u64,
}

impl RngState {
    /// New state at subsequence 0.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            subsequence: 0,
        }
    }

    /// New state positioned at an explicit subsequence.
    pub fn with_subsequence(seed: u64, subsequence: u64) -> Self {
        Self { seed, subsequence }
    }

    /// Seed this state was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of streams handed out so far (plus any initial offset).
    pub fn subsequence(&self) -> u64 {
        self.subsequence
    }

    /// Stream for the current subsequence, without advancing.
    pub fn stream(&self) -> CounterStream {
        CounterStream {
            seed: self.seed,
            subsequence: self.subsequence,
        }
    }

    /// Returns the current stream and advances to the next subsequence.
    pub fn next_stream(&mut self) -> CounterStream {
        let stream = self.stream();
        self.subsequence = self.subsequence.wrapping_add(1);
        stream
    }
}

/// Default [`RngStream`]: SplitMix64 key mixing feeding `xoroshiro128+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterStream {
    seed: u64,
    subsequence: u64,
}

impl CounterStream {
    /// Stream for `(seed, subsequence)`.
    pub fn new(seed: u64, subsequence: u64) -> Self {
        Self { seed, subsequence }
    }
}

impl RngStream for CounterStream {
    fn substream(&self, key: DrawKey) -> Prng {
        let mut state = self.seed;
        let _ = splitmix64(&mut state);
        state ^= self.subsequence;
        let _ = splitmix64(&mut state);
        state ^= key.lineage;
        let _ = splitmix64(&mut state);
        state ^= key.vertex;
        let _ = splitmix64(&mut state);
        state ^= u64::from(key.hop);
        let _ = splitmix64(&mut state);
        state ^= key.draw;
        let s0 = splitmix64(&mut state);
        let s1 = splitmix64(&mut state);
        Prng::from_seed(s0, s1)
    }
}

/// Lineage of the `position`-th starting vertex.
pub fn seed_lineage(position: usize) -> u64 {
    let mut state = SEED_LINEAGE_DOMAIN ^ position as u64;
    splitmix64(&mut state)
}

/// Lineage of the entry reached by draw `draw` from an entry with lineage
/// `parent`.
pub fn derive_lineage(parent: u64, draw: u64) -> u64 {
    let mut state = parent.rotate_left(17) ^ draw;
    splitmix64(&mut state)
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(GOLDEN_GAMMA);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Stateful `xoroshiro128+` generator for a single draw slot.
///
/// * Not cryptographically secure.
/// * Matching seeds yield identical sequences across supported platforms.
#[derive(Debug, Clone, Copy)]
pub struct Prng {
    state: [u64; 2],
}

impl Prng {
    /// Constructs a generator from two 64-bit seeds.
    pub fn from_seed(seed0: u64, seed1: u64) -> Self {
        let mut state = [seed0, seed1];
        if state[0] == 0 && state[1] == 0 {
            state[0] = GOLDEN_GAMMA;
        }
        Self { state }
    }

    /// Constructs a generator from one 64-bit seed via SplitMix64 expansion.
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut sm_state = seed;
        let s0 = splitmix64(&mut sm_state);
        let s1 = splitmix64(&mut sm_state);
        Self::from_seed(s0, s1)
    }

    /// Next raw 64-bit output.
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(55) ^ s1 ^ (s1 << 14);
        self.state[1] = s1.rotate_left(36);

        result
    }

    /// Next float in `[0, 1)` built from the high 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        let raw = self.next_u64() >> 11;
        #[allow(clippy::cast_precision_loss)]
        let value = raw as f64;
        value * F64_UNIT
    }

    /// Next integer in `[0, bound)`; returns 0 when `bound` is 0 or 1.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        if bound <= 1 {
            return 0;
        }
        if bound.is_power_of_two() {
            return self.next_u64() & (bound - 1);
        }
        let zone = u64::MAX - u64::MAX % bound;
        loop {
            let candidate = self.next_u64();
            if candidate < zone {
                break candidate % bound;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn key(lineage: u64, vertex: u64, hop: Hop, draw: u64) -> DrawKey {
        DrawKey {
            lineage,
            vertex,
            hop,
            draw,
        }
    }

    #[test]
    fn substreams_are_pure_functions_of_the_key() {
        let stream = CounterStream::new(7, 0);
        let a = stream.substream(key(1, 2, 0, 3)).next_u64();
        let b = stream.substream(key(1, 2, 0, 3)).next_u64();
        assert_eq!(a, b);
    }

    #[test]
    fn every_key_component_changes_the_stream() {
        let stream = CounterStream::new(7, 0);
        let base = stream.substream(key(1, 2, 0, 3)).next_u64();
        assert_ne!(base, stream.substream(key(9, 2, 0, 3)).next_u64());
        assert_ne!(base, stream.substream(key(1, 9, 0, 3)).next_u64());
        assert_ne!(base, stream.substream(key(1, 2, 1, 3)).next_u64());
        assert_ne!(base, stream.substream(key(1, 2, 0, 4)).next_u64());
        assert_ne!(
            base,
            CounterStream::new(8, 0).substream(key(1, 2, 0, 3)).next_u64()
        );
        assert_ne!(
            base,
            CounterStream::new(7, 1).substream(key(1, 2, 0, 3)).next_u64()
        );
    }

    #[test]
    fn rng_state_advances_once_per_stream() {
        let mut state = RngState::new(11);
        let first = state.next_stream();
        let second = state.next_stream();
        assert_ne!(first, second);
        assert_eq!(state.subsequence(), 2);
        assert_eq!(RngState::new(11).stream(), first);
    }

    #[test]
    fn next_below_stays_in_bounds() {
        let mut prng = Prng::from_seed_u64(3);
        for bound in [1_u64, 2, 3, 7, 8, 1000] {
            for _ in 0..200 {
                assert!(prng.next_below(bound) < bound.max(1));
            }
        }
        assert_eq!(prng.next_below(0), 0);
    }

    #[test]
    fn next_f64_is_unit_interval() {
        let mut prng = Prng::from_seed(42, 99);
        for _ in 0..1000 {
            let x = prng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn zero_seed_is_remapped() {
        let mut prng = Prng::from_seed(0, 0);
        assert_ne!(prng.next_u64(), 0);
    }

    #[test]
    fn lineages_separate_siblings_and_seeds() {
        let root = seed_lineage(0);
        assert_ne!(root, seed_lineage(1));
        assert_ne!(derive_lineage(root, 0), derive_lineage(root, 1));
        assert_ne!(derive_lineage(root, 0), derive_lineage(seed_lineage(1), 0));
    }

    #[test]
    fn draw_indices_beyond_u32_stay_distinct() {
        let stream = CounterStream::new(7, 0);
        let wide = 1_u64 << 32;
        for (low, high) in [(0, wide), (u64::from(u32::MAX), wide), (5, wide + 5)] {
            assert_ne!(
                stream.substream(key(1, 2, 0, low)).next_u64(),
                stream.substream(key(1, 2, 0, high)).next_u64()
            );
            assert_ne!(derive_lineage(3, low), derive_lineage(3, high));
        }
        // Hop and draw no longer share one word.
        assert_ne!(
            stream.substream(key(1, 2, 1, 0)).next_u64(),
            stream.substream(key(1, 2, 0, wide)).next_u64()
        );
    }
}
