//! Secure card issuance and funds-transfer engine.
//!
//! - [`crypto`] seals card numbers at rest with AES-256-GCM.
//! - [`application::generator`] issues Luhn-valid, unique card numbers.
//! - [`domain::lifecycle`] holds the card status state machine.
//! - [`application::engine`] moves funds between cards atomically.
//! - [`domain::ports`] is the persistence boundary, implemented in [`infrastructure`].

pub mod application;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
