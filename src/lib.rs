//! Shared plumbing for the ai-sports binaries: CLI/env settings and stage runners.

pub mod settings;
pub mod stages;
