// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Two-phase tagging workflow: boundary capture, then detail capture.

pub mod effect;
pub mod intent;
pub mod machine;
pub mod session;

pub use effect::{Effect, PendingChoice, PersistRequest};
pub use intent::{FrameworkInput, Intent};
pub use machine::TaggingStateMachine;
pub use session::{BoundaryStep, DetailStep, Phase, Question, WorkflowSession};
