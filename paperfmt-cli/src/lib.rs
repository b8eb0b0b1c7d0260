// All core functionality is in paperfmt-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod preset_store;

// Re-export core types for convenience
pub use paperfmt_core::*;

// Re-export CLI utilities
pub use preset_store::{PresetError, PresetStore};
