// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Numeric identifier newtypes.
//!
//! The wire format assigns small `u32` identifiers (a pip id, a worker id)
//! rather than random strings, so this is a numeric counterpart to the
//! nanoid-backed `define_id!` pattern this codebase otherwise uses for
//! string identifiers: a `Copy` newtype with `Display`, ordering, and serde
//! support, generated once per identifier kind instead of hand-rolled per
//! type.
#[macro_export]
macro_rules! define_numeric_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident(u32);
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            pub const fn value(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }
    };
}

define_numeric_id! {
    /// Identifies a worker as assigned by the orchestrator. Immutable after attach.
    pub struct WorkerId(u32);
}

define_numeric_id! {
    /// Identifies a pip (a unit of build work) within a build session.
    pub struct PipId(u32);
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
