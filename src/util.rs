//! Utility modules for cqql.

pub mod cancel;

pub use cancel::CancellationToken;
