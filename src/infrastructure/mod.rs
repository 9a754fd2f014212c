//! Storage adapters implementing [`crate::domain::ports::CardRepository`].

pub mod in_memory;
pub mod record;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
