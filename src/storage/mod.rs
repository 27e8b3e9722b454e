//! Scratch files and the analysis cache

pub mod cache;
pub mod temp;

// Re-exports for convenience
pub use cache::AnalysisCache;
pub use temp::{TemporaryStore, TokenGuard};
