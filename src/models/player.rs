// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Player identity and court sides.
//!
//! Rules components reason about the two `Side`s of a match; the opaque
//! player identifiers assigned by the persistence layer are only attached
//! through [`Players`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque player identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        PlayerId(value.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        PlayerId(value)
    }
}

/// One of the two participants, independent of their identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player1,
    Player2,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player1 => Side::Player2,
            Side::Player2 => Side::Player1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player1 => f.write_str("player1"),
            Side::Player2 => f.write_str("player2"),
        }
    }
}

/// The two player identifiers of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub player1: PlayerId,
    pub player2: PlayerId,
}

impl Players {
    pub fn new(player1: impl Into<PlayerId>, player2: impl Into<PlayerId>) -> Self {
        Self {
            player1: player1.into(),
            player2: player2.into(),
        }
    }
}
