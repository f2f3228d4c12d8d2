// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic id generation.
//!
//! The kernel hands out four families of id — processor, monitor, rule-index
//! node, and worker-thread ids — and every one of them is "a dedicated
//! monotonic source...exposed for observability only; the kernel never
//! compares ids for ordering". [`IdSource`] is that source; [`define_monotonic_id!`]
//! wraps it in a typed newtype so the four families can't be mixed up at a
//! call site.

use std::sync::atomic::{AtomicU64, Ordering};

/// A dedicated, monotonically increasing `u64` counter.
///
/// Starts at 1 so `0` is free to use as an "unset" sentinel by callers that
/// want one; the kernel itself never relies on that.
#[derive(Debug, Default)]
pub struct IdSource(AtomicU64);

impl IdSource {
    pub const fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Mint the next id in the sequence.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Define a `Copy` newtype wrapper around `u64` with an attached [`IdSource`]
/// for minting fresh, process-unique instances.
///
/// ```ignore
/// cascade_core::define_monotonic_id! {
///     /// Doc comment for the id type.
///     pub struct MonitorId;
/// }
/// ```
#[macro_export]
macro_rules! define_monotonic_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Mint a fresh, process-unique id.
            pub fn next() -> Self {
                static SOURCE: $crate::id::IdSource = $crate::id::IdSource::new();
                Self(SOURCE.next())
            }

            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
