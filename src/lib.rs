// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Rally tagger
//!
//! Annotation engine for table tennis match video. An operator first marks
//! rally boundaries and shot contacts, then answers per-shot questions; the
//! engine derives servers, rally outcomes and scores from those answers.

pub mod app;
pub mod config;
pub mod correction;
pub mod error;
pub mod io;
pub mod models;
pub mod rules;
pub mod util;
pub mod workflow;
