// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invocation identity carried on every RPC.

use serde::{Deserialize, Serialize};

/// Identifies the distributed build session. Both peers validate equality
/// on every RPC; a mismatch is an `UnrecoverableFailure` (see
/// `DistributionError::UnrecoverableFailure`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationId {
    pub related_activity_id: String,
    pub environment: String,
}

impl InvocationId {
    pub fn new(related_activity_id: impl Into<String>, environment: impl Into<String>) -> Self {
        Self { related_activity_id: related_activity_id.into(), environment: environment.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_invocation_ids_compare_equal() {
        let a = InvocationId::new("activity-1", "prod");
        let b = InvocationId::new("activity-1", "prod");
        assert_eq!(a, b);
    }

    #[test]
    fn differing_environment_is_not_equal() {
        let a = InvocationId::new("activity-1", "prod");
        let b = InvocationId::new("activity-1", "staging");
        assert_ne!(a, b);
    }
}
