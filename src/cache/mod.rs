/// concrete cache levels that plug into the coordinator.
/// use cases:
/// * in-memory spot-cache in front of a hosted store, e.g., redis or a sql table
/// * stand-in level for tests of coordinator policies
///
/// Think of the coordinator like the cache hierarchy of a CPU: level 1 is closest to
/// the app, and the fastest.  Level 2 is one step away, e.g., hosted Redis and Level 3
/// is a SQL or Mongo hosted database.  A `MemoryWorker` is a natural level 1.
///
pub mod worker;

pub use worker::MemoryWorker;
