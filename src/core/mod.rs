//! Core pipeline logic and abstractions

pub mod config;
pub mod export;
pub mod load;
pub mod lock;
pub mod log;
pub mod nav;
pub mod pipeline;
pub mod store;
pub mod sync;

// Re-export main types for cleaner imports
pub use nav::{FetchMode, Fund, NavProvider, NavRecord};
pub use store::NavStore;
pub use sync::{FundOutcome, SyncReport};
