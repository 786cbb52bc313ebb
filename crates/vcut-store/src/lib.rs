//! State store for the video cut pipeline.
//!
//! This crate provides:
//! - The `StateStore` key/value seam (get, set with expiry, delete, ping)
//! - A Redis implementation and an in-memory one for tests
//! - `StateRepository`, the typed view over the four record kinds

pub mod config;
pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod repository;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStateStore;
pub use redis_store::RedisStateStore;
pub use repository::StateRepository;
pub use store::StateStore;
