//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `CardEngine`, the single entry point for issuing
//! cards, changing their status and moving funds between them. Concurrent
//! callers are serialized per card through `CardLocks`.

pub mod engine;
pub mod generator;
pub mod locks;
