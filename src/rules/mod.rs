// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pure domain rules: serve rotation, rally outcomes, score progression,
//! and the consistency audit built on them.

pub mod audit;
pub mod rally_outcome;
pub mod score_progression;
pub mod serve_rotation;
