// Collapse perfect matches per priority order
// Keeps, per (id_loan, sector, sector_abcd) group, the single score = 1 row
// whose level comes earliest in the priority order.

use log::warn;
use std::collections::HashMap;

use crate::error::{MatchError, MatchWarning};
use crate::hierarchy::level_sort_key;
use crate::matching::{MatchOutcome, MatchRow};
use crate::validate;

/// How the level precedence is chosen.
#[derive(Debug, Clone)]
pub enum Priority {
    /// Direct levels first, intermediates in suffix order, ultimate last.
    Default,
    /// An explicit full or partial list. Levels absent from the data are
    /// ignored with a warning; levels absent from the list keep their
    /// default order after the listed ones.
    Explicit(Vec<String>),
    /// A transform applied to the default order, e.g. reversal.
    Transform(fn(Vec<String>) -> Vec<String>),
}

/// Default priority order over the distinct levels present in the rows.
pub fn prioritize_level(rows: &[MatchRow]) -> Vec<String> {
    let mut levels: Vec<String> = Vec::new();
    for row in rows {
        if !levels.contains(&row.level) {
            levels.push(row.level.clone());
        }
    }
    levels.sort_by_key(|l| level_sort_key(l));
    levels
}

/// Collapses the score = 1 rows of a match result to one row per
/// (id_loan, sector, sector_abcd) group. Fails when a perfect match is not
/// unique per (id_loan, level).
pub fn prioritize(
    outcome: &MatchOutcome,
    priority: &Priority,
) -> Result<MatchOutcome, MatchError> {
    validate::unique_perfect_matches(&outcome.rows)?;

    let mut warnings = Vec::new();
    let default_order = prioritize_level(&outcome.rows);
    let order = resolve_order(&default_order, priority, &mut warnings);

    let rank = |level: &str| -> usize {
        order
            .iter()
            .position(|l| l == level)
            .unwrap_or(usize::MAX)
    };

    // One winner per group; earlier rank wins, first row encountered wins ties.
    let perfect: Vec<&MatchRow> = outcome.rows.iter().filter(|r| r.score == 1.0).collect();
    let mut winners: HashMap<(String, String, String), usize> = HashMap::new();
    for (index, row) in perfect.iter().enumerate() {
        let key = (
            row.id_loan.clone(),
            row.sector.clone(),
            row.sector_abcd.clone(),
        );
        let replace = match winners.get(&key) {
            Some(&current) => rank(&perfect[current].level) > rank(&row.level),
            None => true,
        };
        if replace {
            winners.insert(key, index);
        }
    }

    let rows: Vec<MatchRow> = perfect
        .iter()
        .enumerate()
        .filter(|(index, row)| {
            let key = (
                row.id_loan.clone(),
                row.sector.clone(),
                row.sector_abcd.clone(),
            );
            winners.get(&key).copied() == Some(*index)
        })
        .map(|(_, row)| (*row).clone())
        .collect();

    for warning in &warnings {
        warn!("{}", warning);
    }

    Ok(MatchOutcome {
        loanbook_columns: outcome.loanbook_columns.clone(),
        rows,
        warnings,
    })
}

fn resolve_order(
    default_order: &[String],
    priority: &Priority,
    warnings: &mut Vec<MatchWarning>,
) -> Vec<String> {
    match priority {
        Priority::Default => default_order.to_vec(),
        Priority::Explicit(list) => {
            let unknown: Vec<String> = list
                .iter()
                .filter(|l| !default_order.contains(l))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                warnings.push(MatchWarning::UnknownPriorityLevels { levels: unknown });
            }

            let mut order: Vec<String> = list
                .iter()
                .filter(|l| default_order.contains(l))
                .cloned()
                .collect();
            for level in default_order {
                if !order.contains(level) {
                    order.push(level.clone());
                }
            }
            order
        }
        Priority::Transform(transform) => transform(default_order.to_vec()),
    }
}
