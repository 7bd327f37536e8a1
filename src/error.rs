// Error taxonomy for the matching engine
// Fatal errors abort the call with the offending columns/rows named;
// recoverable warnings are carried on the outcome and logged.

use thiserror::Error;

// ============================================================================
// FATAL ERRORS
// ============================================================================

/// Fatal configuration or input errors. None of these produce partial output.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A required input column is absent.
    #[error("missing required column(s) in {table}: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    /// The caller's loanbook already carries reserved output column names.
    #[error(
        "reserved column(s) already present in loanbook: {}; \
         remove them or set `allow_reserved_columns`",
        .columns.join(", ")
    )]
    ReservedColumns { columns: Vec<String> },

    /// Reserved columns were permitted but only one of the sector pair came.
    #[error(
        "when reserved columns are permitted, `sector` and `borderline` must \
         be supplied together (missing `{missing}`)"
    )]
    PartialSectorOverride { missing: String },

    /// Loan identifiers must be unique across the loanbook.
    #[error("duplicated id_loan: {}", .ids.join(", "))]
    DuplicatedLoanId { ids: Vec<String> },

    /// A hierarchy level has a name but no paired identifier.
    #[error("has name but not id: {}", .offenders.join(", "))]
    NameButNotId { offenders: Vec<String> },

    /// Not a single sector classification code could be resolved.
    #[error(
        "no sector classification code could be resolved; \
         matching cannot proceed without any valid sector context"
    )]
    NoSectorResolved,

    /// More than one score = 1 match for the same (id_loan, level).
    #[error("duplicated score = 1 match for: {}", .keys
        .iter()
        .map(|(id, level)| format!("id_loan `{}` at level `{}`", id, level))
        .collect::<Vec<_>>()
        .join("; "))]
    DuplicatedPerfectMatch { keys: Vec<(String, String)> },

    /// A cell could not be parsed into the type the engine needs.
    #[error("invalid value in column `{column}` at row {row}: {value}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
}

// ============================================================================
// RECOVERABLE WARNINGS
// ============================================================================

/// Recoverable conditions. Processing continues; the caller is informed via
/// the outcome's warning list and `log::warn!`.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchWarning {
    /// Some (but not all) sector classification codes were unknown.
    UnresolvedSectorCodes { codes: Vec<String> },

    /// No candidate cleared the minimum score; result is empty but well shaped.
    NoMatch,

    /// An overwrite rule replaced a value that disagreed with the match.
    OverwriteConflict { level: String, id_2dii: String },

    /// An explicit priority list named levels absent from the data.
    UnknownPriorityLevels { levels: Vec<String> },
}

impl std::fmt::Display for MatchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchWarning::UnresolvedSectorCodes { codes } => write!(
                f,
                "unknown sector classification code(s): {}; matching only the resolvable rows",
                codes.join(", ")
            ),
            MatchWarning::NoMatch => {
                write!(f, "no match found; returning an empty result")
            }
            MatchWarning::OverwriteConflict { level, id_2dii } => write!(
                f,
                "overwrite disagrees with the matched value for level `{}`, id_2dii `{}`; \
                 the overwrite wins",
                level, id_2dii
            ),
            MatchWarning::UnknownPriorityLevels { levels } => write!(
                f,
                "ignoring unknown priority level(s): {}",
                levels.join(", ")
            ),
        }
    }
}
