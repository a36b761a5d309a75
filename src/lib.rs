#![doc = include_str!("../README.md")]

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod level;
pub mod value;
pub mod worker;

pub use cache::MemoryWorker;
pub use config::CoordinatorSettings;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use level::{CacheLevel, Compute, ComputeFn, NoCompute};
pub use value::CacheValue;

/// the current app version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
