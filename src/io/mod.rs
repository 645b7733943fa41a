// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Collaborators at the edge of the workflow: media player, persistence
//! and match record files.

pub mod persistence;
pub mod player;
pub mod serialization;
