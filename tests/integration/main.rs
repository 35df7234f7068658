//! Integration Tests
//!
//! End-to-end tests through the `ltrank` facade, organized by concern:
//! - Scenarios: reference rerank and logging outcomes
//! - Determinism: parallel and sequential rescoring agree
//! - Registry: definition lifecycle and persistence
//! - Properties: randomized model and logging invariants

#[path = "../common/mod.rs"]
mod common;

mod determinism;
mod properties;
mod registry;
mod scenarios;
