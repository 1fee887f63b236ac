pub mod clock;
pub mod storage;

// Re-export all port traits for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use storage::RegistryStore;
