// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Entity identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a framework, set, rally or shot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId(value.to_string())
    }
}

/// Hands out human-legible identifiers (`rally-0007`, `shot-0042`, ...).
///
/// Counters are monotonic per prefix so a deleted entity's identifier is
/// never reused within a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next_match: u32,
    next_set: u32,
    next_rally: u32,
    next_shot: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn framework(&mut self) -> EntityId {
        self.next_match += 1;
        EntityId(format!("match-{:02}", self.next_match))
    }

    pub fn set(&mut self) -> EntityId {
        self.next_set += 1;
        EntityId(format!("set-{:02}", self.next_set))
    }

    pub fn rally(&mut self) -> EntityId {
        self.next_rally += 1;
        EntityId(format!("rally-{:04}", self.next_rally))
    }

    pub fn shot(&mut self) -> EntityId {
        self.next_shot += 1;
        EntityId(format!("shot-{:05}", self.next_shot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_per_kind() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.rally().0, "rally-0001");
        assert_eq!(ids.rally().0, "rally-0002");
        assert_eq!(ids.shot().0, "shot-00001");
        assert_eq!(ids.set().0, "set-01");
        assert_eq!(ids.framework().0, "match-01");
    }
}
