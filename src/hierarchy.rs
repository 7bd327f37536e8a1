// Ownership-hierarchy expansion
// Turns one loan row with N hierarchy levels into N independent matchable
// candidates. Levels are recognized once from the frame schema as an explicit
// ordered list of descriptors, not re-derived at every stage.

use regex::Regex;
use std::sync::OnceLock;

use crate::alias::to_alias;
use crate::error::MatchError;
use crate::frame::Frame;

/// One hierarchy level: its exposed tag and the columns that hold it.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDescriptor {
    /// Exposed level tag, exactly one of direct_loantaker,
    /// intermediate_parent_k or ultimate_parent.
    pub tag: String,
    pub id_field: String,
    pub name_field: String,
}

/// One matchable counterparty extracted from a loan row.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Index of the originating loanbook row.
    pub row: usize,
    pub id_loan: String,
    pub level: String,
    pub id: String,
    pub name: String,
    /// Normalized form of `name`, used for similarity scoring.
    pub alias: String,
    /// Resolved sector, lowercased.
    pub sector: String,
    pub borderline: bool,
}

fn level_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^name_(direct_loantaker|intermediate_parent(?:_\d+)?|ultimate_parent)$")
            .unwrap()
    })
}

/// Builds the ordered level descriptors from the loanbook schema. A name
/// column without its paired id column is a fatal error.
pub fn detect_levels(loanbook: &Frame) -> Result<Vec<LevelDescriptor>, MatchError> {
    let mut levels = Vec::new();
    let mut offenders = Vec::new();

    for column in loanbook.columns() {
        let Some(captures) = level_name_pattern().captures(column) else {
            continue;
        };
        let tag = captures[1].to_string();
        let id_field = format!("id_{}", tag);

        if loanbook.has_column(&id_field) {
            levels.push(LevelDescriptor {
                tag,
                id_field,
                name_field: column.clone(),
            });
        } else {
            offenders.push(format!("column `{}`", column));
        }
    }

    if !offenders.is_empty() {
        return Err(MatchError::NameButNotId { offenders });
    }

    levels.sort_by_key(|l| level_sort_key(&l.tag));
    Ok(levels)
}

/// Ordering key for level tags: direct levels first, intermediates next in
/// natural suffix order, ultimate last. Shared with the prioritizer.
pub fn level_sort_key(tag: &str) -> (u8, u32, String) {
    let class = if tag.contains("direct") {
        0
    } else if tag.contains("intermediate") {
        1
    } else if tag.contains("ultimate") {
        2
    } else {
        3
    };
    let suffix: u32 = tag
        .rsplit('_')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    (class, suffix, tag.to_string())
}

/// Expands the loanbook into one candidate per (loan, level) where both name
/// and id are present. `sectors` holds the per-row resolved sector; rows
/// without one are skipped (the resolver already warned about them).
///
/// A row with a level name but no level id is a fatal error.
pub fn expand(
    loanbook: &Frame,
    levels: &[LevelDescriptor],
    sectors: &[Option<(String, bool)>],
) -> Result<Vec<Candidate>, MatchError> {
    let mut candidates = Vec::new();
    let mut offenders = Vec::new();

    for row in 0..loanbook.len() {
        let Some((sector, borderline)) = sectors[row].as_ref() else {
            continue;
        };
        let id_loan = loanbook.get(row, "id_loan").unwrap_or("").to_string();

        for level in levels {
            let name = loanbook.get(row, &level.name_field);
            let id = loanbook.get(row, &level.id_field);

            match (name, id) {
                (Some(name), Some(id)) => candidates.push(Candidate {
                    row,
                    id_loan: id_loan.clone(),
                    level: level.tag.clone(),
                    id: id.to_string(),
                    name: name.to_string(),
                    alias: to_alias(name),
                    sector: sector.clone(),
                    borderline: *borderline,
                }),
                (Some(_), None) => offenders.push(format!(
                    "id_loan `{}` at level `{}`",
                    id_loan, level.tag
                )),
                _ => {}
            }
        }
    }

    if !offenders.is_empty() {
        return Err(MatchError::NameButNotId { offenders });
    }

    Ok(candidates)
}
