//! Per-user preference stores for Portico.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FilePreferences;
pub use in_memory::InMemoryPreferences;
