// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data models for matches, sets, rallies and shots.

pub mod framework;
pub mod ids;
pub mod match_record;
pub mod outcome;
pub mod player;
pub mod rally;
pub mod score;
pub mod set;
pub mod shot;
