// Input and output validation
// Enforces required columns, reserved-column conflicts and key uniqueness.
// Validation failures never produce partial output.

use std::collections::{HashMap, HashSet};

use crate::error::MatchError;
use crate::frame::Frame;
use crate::matching::MatchRow;

/// Columns the engine must find on the loanbook.
pub const REQUIRED_LOANBOOK_COLUMNS: [&str; 7] = [
    "id_loan",
    "id_direct_loantaker",
    "name_direct_loantaker",
    "id_ultimate_parent",
    "name_ultimate_parent",
    "sector_classification_system",
    "sector_classification_direct_loantaker",
];

/// Columns the engine must find on the ABCD table.
pub const REQUIRED_ABCD_COLUMNS: [&str; 2] = ["name_company", "sector"];

/// Output column names the engine claims for itself.
pub const RESERVED_COLUMNS: [&str; 12] = [
    "rowid",
    "level",
    "id_2dii",
    "sector",
    "sector_abcd",
    "name",
    "name_abcd",
    "score",
    "source",
    "borderline",
    "alias",
    "alias_abcd",
];

/// Where the per-loan sector context comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorSource {
    /// Resolve classification codes through the lookup table.
    Lookup,
    /// The caller supplied `sector` and `borderline` columns directly.
    Columns,
}

pub fn required_loanbook_columns(loanbook: &Frame) -> Result<(), MatchError> {
    required_columns(loanbook, "loanbook", &REQUIRED_LOANBOOK_COLUMNS)
}

pub fn required_abcd_columns(abcd: &Frame) -> Result<(), MatchError> {
    required_columns(abcd, "abcd", &REQUIRED_ABCD_COLUMNS)
}

fn required_columns(frame: &Frame, table: &str, required: &[&str]) -> Result<(), MatchError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !frame.has_column(c))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MatchError::MissingColumns {
            table: table.to_string(),
            columns: missing,
        })
    }
}

/// Rejects reserved output columns on the caller's loanbook unless permitted.
/// When permitted, `sector` and `borderline` must come together; the return
/// value says whether sector context comes from those columns or the lookup.
pub fn check_reserved_columns(
    loanbook: &Frame,
    allow_reserved: bool,
) -> Result<SectorSource, MatchError> {
    let present: Vec<String> = RESERVED_COLUMNS
        .iter()
        .filter(|c| loanbook.has_column(c))
        .map(|c| c.to_string())
        .collect();

    if present.is_empty() {
        return Ok(SectorSource::Lookup);
    }

    if !allow_reserved {
        return Err(MatchError::ReservedColumns { columns: present });
    }

    let has_sector = loanbook.has_column("sector");
    let has_borderline = loanbook.has_column("borderline");
    match (has_sector, has_borderline) {
        (true, true) => Ok(SectorSource::Columns),
        (true, false) => Err(MatchError::PartialSectorOverride {
            missing: "borderline".to_string(),
        }),
        (false, true) => Err(MatchError::PartialSectorOverride {
            missing: "sector".to_string(),
        }),
        (false, false) => Ok(SectorSource::Lookup),
    }
}

/// Loan identifiers must be unique across the loanbook.
pub fn unique_loan_ids(loanbook: &Frame) -> Result<(), MatchError> {
    let mut seen = HashSet::new();
    let mut duplicated = Vec::new();

    for row in 0..loanbook.len() {
        let id = loanbook.get(row, "id_loan").unwrap_or("").to_string();
        if !seen.insert(id.clone()) && !duplicated.contains(&id) {
            duplicated.push(id);
        }
    }

    if duplicated.is_empty() {
        Ok(())
    } else {
        Err(MatchError::DuplicatedLoanId { ids: duplicated })
    }
}

/// A score = 1 match must be unique per (id_loan, level). Run before
/// prioritization; guards against a corrupt overwrite table.
pub fn unique_perfect_matches(rows: &[MatchRow]) -> Result<(), MatchError> {
    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    for row in rows.iter().filter(|r| r.score == 1.0) {
        *counts
            .entry((row.id_loan.clone(), row.level.clone()))
            .or_insert(0) += 1;
    }

    let mut keys: Vec<(String, String)> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(key, _)| key)
        .collect();
    keys.sort();

    if keys.is_empty() {
        Ok(())
    } else {
        Err(MatchError::DuplicatedPerfectMatch { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_columns(columns: &[&str]) -> Frame {
        Frame::new(columns.iter().map(|c| c.to_string()).collect())
    }

    fn minimal_loanbook_columns() -> Vec<&'static str> {
        REQUIRED_LOANBOOK_COLUMNS.to_vec()
    }

    #[test]
    fn test_missing_loanbook_columns_are_named() {
        let frame = frame_with_columns(&["id_loan", "name_direct_loantaker"]);
        let err = required_loanbook_columns(&frame).unwrap_err();
        match err {
            MatchError::MissingColumns { table, columns } => {
                assert_eq!(table, "loanbook");
                assert!(columns.contains(&"id_direct_loantaker".to_string()));
                assert!(columns.contains(&"sector_classification_system".to_string()));
                assert!(!columns.contains(&"id_loan".to_string()));
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_loanbook_passes() {
        let frame = frame_with_columns(&minimal_loanbook_columns());
        assert!(required_loanbook_columns(&frame).is_ok());
        assert!(check_reserved_columns(&frame, false).is_ok());
    }

    #[test]
    fn test_reserved_columns_rejected_by_default() {
        let mut columns = minimal_loanbook_columns();
        columns.push("sector");
        columns.push("score");
        let frame = frame_with_columns(&columns);

        let err = check_reserved_columns(&frame, false).unwrap_err();
        match err {
            MatchError::ReservedColumns { columns } => {
                assert_eq!(columns, vec!["sector".to_string(), "score".to_string()]);
            }
            other => panic!("expected ReservedColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_permitted_sector_and_borderline_come_together() {
        let mut columns = minimal_loanbook_columns();
        columns.push("sector");
        let frame = frame_with_columns(&columns);

        let err = check_reserved_columns(&frame, true).unwrap_err();
        assert!(matches!(
            err,
            MatchError::PartialSectorOverride { ref missing } if missing == "borderline"
        ));

        columns.push("borderline");
        let frame = frame_with_columns(&columns);
        assert_eq!(
            check_reserved_columns(&frame, true).unwrap(),
            SectorSource::Columns
        );
    }

    #[test]
    fn test_duplicate_loan_ids_are_fatal() {
        let mut frame = frame_with_columns(&["id_loan"]);
        frame.push_row(vec![Some("L1".to_string())]);
        frame.push_row(vec![Some("L2".to_string())]);
        frame.push_row(vec![Some("L1".to_string())]);

        let err = unique_loan_ids(&frame).unwrap_err();
        match err {
            MatchError::DuplicatedLoanId { ids } => assert_eq!(ids, vec!["L1".to_string()]),
            other => panic!("expected DuplicatedLoanId, got {:?}", other),
        }
    }
}
