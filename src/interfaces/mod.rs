//! Outer surfaces that feed the engine: currently CSV scripts.

pub mod csv;
