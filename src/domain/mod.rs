//! Domain layer for the style checker
//!
//! CDD Principle: Domain Model - Pure logic for style conformance
//! - Identifiers describe what the scanner found in source text
//! - Violations, diagnostics and the aggregated report describe what the checker concluded
//! - Independent of file systems, terminals and configuration formats

pub mod identifiers;
pub mod violations;

// Re-export main domain types for convenience
pub use identifiers::*;
pub use violations::*;
