// Loanbook Matching System - Core Library
// Matches loanbook counterparties against an asset-based company dataset (ABCD)
// at every level of the borrower ownership hierarchy.

pub mod frame;      // In-memory CSV-backed table
pub mod error;      // Fatal errors + recoverable warnings
pub mod alias;      // Company name normalization
pub mod similarity; // Pluggable string-similarity scoring
pub mod sectors;    // Sector classification lookup
pub mod hierarchy;  // Ownership-hierarchy expansion
pub mod validate;   // Input and output validation
pub mod matching;   // Matching engine - identifier join + fuzzy join
pub mod overwrite;  // Manual overwrite injection
pub mod prioritize; // Collapse perfect matches per priority order

// Re-export commonly used types
pub use frame::Frame;
pub use error::{MatchError, MatchWarning};
pub use alias::to_alias;
pub use similarity::SimilarityMethod;
pub use sectors::{SectorClassification, SectorLookup};
pub use hierarchy::{Candidate, LevelDescriptor};
pub use matching::{
    match_name, JoinId, MatchOptions, MatchOutcome, MatchRow, MatchSource,
};
pub use overwrite::OverwriteRule;
pub use prioritize::{prioritize, prioritize_level, Priority};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
