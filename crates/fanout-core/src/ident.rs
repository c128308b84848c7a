// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Integer and property widths accepted by the sampler.
//!
//! The sampling algorithm is width-agnostic. Vertex ids, edge ids and edge
//! weights are generic parameters so the narrow/wide combinations share one
//! implementation:
//!
//! | vertex | edge id | weight |
//! |--------|---------|--------|
//! | `i32`  | `i32`   | `f32` / `f64` |
//! | `i32`  | `i64`   | `f32` / `f64` |
//! | `i64`  | `i64`   | `f32` / `f64` |
//!
//! Unsigned widths are accepted as well.

use std::fmt::Debug;
use std::hash::Hash;

/// Caller-assigned group identifier used to partition output rows.
pub type Label = i32;

/// Edge type tag carried alongside an edge.
pub type EdgeType = i32;

/// Zero-based hop index.
pub type Hop = u32;

/// A vertex identifier of some integer width.
pub trait VertexId: Copy + Ord + Hash + Debug + Send + Sync + 'static {
    /// Widened value for diagnostics; lossless for every supported width.
    fn to_i128(self) -> i128;

    /// Non-negative index of the vertex, or `None` when the id is negative.
    fn to_index(self) -> Option<u64>;

    /// Builds an id from an index, or `None` when it does not fit the width.
    fn from_index(index: u64) -> Option<Self>;
}

/// An edge identifier of some integer width (independent of [`VertexId`]).
pub trait EdgeIdType: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

/// A floating-point edge weight.
pub trait EdgeWeight: Copy + PartialOrd + Debug + Send + Sync + 'static {
    /// Weight as `f64` for the sampling arithmetic.
    fn to_f64(self) -> f64;
}

macro_rules! impl_signed_id {
    ($($t:ty),*) => {$(
        impl VertexId for $t {
            #[inline]
            fn to_i128(self) -> i128 {
                i128::from(self)
            }

            #[inline]
            fn to_index(self) -> Option<u64> {
                u64::try_from(self).ok()
            }

            #[inline]
            fn from_index(index: u64) -> Option<Self> {
                <$t>::try_from(index).ok()
            }
        }

        impl EdgeIdType for $t {}
    )*};
}

macro_rules! impl_unsigned_id {
    ($($t:ty),*) => {$(
        impl VertexId for $t {
            #[inline]
            fn to_i128(self) -> i128 {
                i128::from(self)
            }

            #[inline]
            fn to_index(self) -> Option<u64> {
                Some(u64::from(self))
            }

            #[inline]
            fn from_index(index: u64) -> Option<Self> {
                <$t>::try_from(index).ok()
            }
        }

        impl EdgeIdType for $t {}
    )*};
}

impl_signed_id!(i32, i64);
impl_unsigned_id!(u32, u64);

impl EdgeWeight for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl EdgeWeight for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}
