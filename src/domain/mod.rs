//! Domain layer: card value objects, the lifecycle state machine, the
//! checksum, and the ports the application layer depends on.

pub mod balance;
pub mod card;
pub mod lifecycle;
pub mod luhn;
pub mod ports;
