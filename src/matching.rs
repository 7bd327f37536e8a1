// Matching engine - identifier join + fuzzy join
// Expands the loanbook into per-level candidates, resolves their sector
// context, joins them to ABCD companies by explicit identifier when
// configured and by normalized-name similarity otherwise, then injects
// manual overwrites.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{MatchError, MatchWarning};
use crate::frame::Frame;
use crate::hierarchy::{self, Candidate};
use crate::overwrite::{self, OverwriteRule};
use crate::sectors::SectorLookup;
use crate::similarity::SimilarityMethod;
use crate::validate::{self, SectorSource};

/// Engine-owned columns appended after the echoed loanbook columns.
pub const OUTPUT_COLUMNS: [&str; 9] = [
    "level",
    "id_2dii",
    "sector",
    "sector_abcd",
    "name",
    "name_abcd",
    "score",
    "source",
    "borderline",
];

// ============================================================================
// OPTIONS
// ============================================================================

/// Identifier-column mapping for the explicit identifier join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinId {
    /// Column on the loanbook. May name one of the per-level id columns, in
    /// which case the join applies at that level; any other column applies
    /// its value to every level of the loan.
    pub loanbook: String,
    /// Column on the ABCD table.
    pub abcd: String,
}

impl JoinId {
    /// Same column name on both sides.
    pub fn same(column: &str) -> Self {
        JoinId {
            loanbook: column.to_string(),
            abcd: column.to_string(),
        }
    }

    pub fn pair(loanbook: &str, abcd: &str) -> Self {
        JoinId {
            loanbook: loanbook.to_string(),
            abcd: abcd.to_string(),
        }
    }
}

/// Configuration threaded through every call. No process-global switches.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Restrict fuzzy scoring to ABCD rows of the candidate's sector.
    pub by_sector: bool,
    /// Inclusive minimum similarity score kept by the fuzzy join.
    pub min_score: f64,
    /// Similarity method passed through verbatim to the scoring primitive.
    pub method: SimilarityMethod,
    /// Manual corrections applied after matching.
    pub overwrite: Option<Vec<OverwriteRule>>,
    /// Explicit identifier join, tried before fuzzy matching.
    pub join_id: Option<JoinId>,
    /// Permit reserved output column names already present on the loanbook.
    pub allow_reserved_columns: bool,
    /// Sector classification table; None means the bundled table.
    pub sector_lookup: Option<SectorLookup>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            by_sector: true,
            min_score: 0.8,
            method: SimilarityMethod::default(),
            overwrite: None,
            join_id: None,
            allow_reserved_columns: false,
            sector_lookup: None,
        }
    }
}

// ============================================================================
// MATCH ROWS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSource {
    Loanbook,
    Manual,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Loanbook => "loanbook",
            MatchSource::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("loanbook") {
            MatchSource::Loanbook
        } else {
            MatchSource::Manual
        }
    }
}

/// One candidate paired with one ABCD company it was joined to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRow {
    /// Echoed loanbook cells, ordered by the loanbook columns.
    pub source_row: Vec<Option<String>>,
    pub id_loan: String,
    pub level: String,
    /// Synthetic match identifier, stable per matched company within a run.
    pub id_2dii: String,
    /// Resolved loanbook-side sector, lowercased.
    pub sector: String,
    pub sector_abcd: String,
    /// Canonical counterparty name from the loanbook level.
    pub name: String,
    /// Original-case ABCD company name.
    pub name_abcd: String,
    pub score: f64,
    pub source: MatchSource,
    pub borderline: bool,
}

/// Result of `match_name`. Always carries the full loanbook column list so an
/// empty result has the same shape as a non-empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub loanbook_columns: Vec<String>,
    pub rows: Vec<MatchRow>,
    pub warnings: Vec<MatchWarning>,
}

impl MatchOutcome {
    /// Flatten into a frame: echoed loanbook columns plus OUTPUT_COLUMNS.
    pub fn to_frame(&self) -> Frame {
        let mut columns = self.loanbook_columns.clone();
        columns.extend(OUTPUT_COLUMNS.iter().map(|c| c.to_string()));

        let mut frame = Frame::new(columns);
        for row in &self.rows {
            let mut cells = row.source_row.clone();
            cells.push(Some(row.level.clone()));
            cells.push(Some(row.id_2dii.clone()));
            cells.push(Some(row.sector.clone()));
            cells.push(Some(row.sector_abcd.clone()));
            cells.push(Some(row.name.clone()));
            cells.push(Some(row.name_abcd.clone()));
            cells.push(Some(format!("{}", row.score)));
            cells.push(Some(row.source.as_str().to_string()));
            cells.push(Some(row.borderline.to_string()));
            frame.push_row(cells);
        }
        frame
    }

    /// Rebuild an outcome from a previously exported frame. Supports the
    /// manual-review round-trip (export, hand-edit, prioritize or overwrite).
    pub fn from_frame(frame: &Frame) -> Result<MatchOutcome, MatchError> {
        let missing: Vec<String> = OUTPUT_COLUMNS
            .iter()
            .chain(["id_loan"].iter())
            .filter(|c| !frame.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MatchError::MissingColumns {
                table: "matched".to_string(),
                columns: missing,
            });
        }

        let loanbook_columns: Vec<String> = frame
            .columns()
            .iter()
            .filter(|c| !OUTPUT_COLUMNS.contains(&c.as_str()))
            .cloned()
            .collect();
        let loanbook_indices: Vec<usize> = loanbook_columns
            .iter()
            .map(|c| frame.column_index(c).unwrap())
            .collect();

        let mut rows = Vec::new();
        for i in 0..frame.len() {
            let cell = |column: &str| frame.get(i, column).unwrap_or("").to_string();

            let score_text = cell("score");
            let score: f64 = score_text.parse().map_err(|_| MatchError::InvalidValue {
                column: "score".to_string(),
                row: i,
                value: score_text.clone(),
            })?;
            let borderline_text = cell("borderline");
            let borderline = parse_bool(&borderline_text).ok_or(MatchError::InvalidValue {
                column: "borderline".to_string(),
                row: i,
                value: borderline_text,
            })?;

            rows.push(MatchRow {
                source_row: loanbook_indices
                    .iter()
                    .map(|&col| frame.row(i)[col].clone())
                    .collect(),
                id_loan: cell("id_loan"),
                level: cell("level"),
                id_2dii: cell("id_2dii"),
                sector: cell("sector"),
                sector_abcd: cell("sector_abcd"),
                name: cell("name"),
                name_abcd: cell("name_abcd"),
                score,
                source: MatchSource::parse(&cell("source")),
                borderline,
            });
        }

        Ok(MatchOutcome {
            loanbook_columns,
            rows,
            warnings: Vec::new(),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// One deduplicated ABCD company-sector observation.
#[derive(Debug, Clone)]
struct AbcdEntry {
    name: String,
    alias: String,
    sector: String,
    join_value: Option<String>,
}

/// Matches every loanbook counterparty against the ABCD table.
pub fn match_name(
    loanbook: &Frame,
    abcd: &Frame,
    options: &MatchOptions,
) -> Result<MatchOutcome, MatchError> {
    validate::required_loanbook_columns(loanbook)?;
    validate::required_abcd_columns(abcd)?;
    let sector_source =
        validate::check_reserved_columns(loanbook, options.allow_reserved_columns)?;
    validate::unique_loan_ids(loanbook)?;

    if let Some(join) = &options.join_id {
        check_join_columns(loanbook, abcd, join)?;
    }

    let levels = hierarchy::detect_levels(loanbook)?;
    debug!(
        "Detected {} hierarchy level(s): {:?}",
        levels.len(),
        levels.iter().map(|l| l.tag.as_str()).collect::<Vec<_>>()
    );

    let mut warnings = Vec::new();
    let sectors = resolve_row_sectors(loanbook, sector_source, options, &mut warnings)?;

    let candidates = hierarchy::expand(loanbook, &levels, &sectors)?;
    let entries = collect_abcd(abcd, options.join_id.as_ref());
    info!(
        "Matching {} candidate(s) against {} ABCD compan(ies)",
        candidates.len(),
        entries.len()
    );

    let mut rows = Vec::new();
    let mut id_registry = IdRegistry::new();
    for candidate in &candidates {
        let mut scored = identifier_join(candidate, &entries, options, loanbook);
        if scored.is_empty() {
            scored = fuzzy_join(candidate, &entries, options);
        }
        for (entry_index, score) in scored {
            let entry = &entries[entry_index];
            rows.push(MatchRow {
                source_row: loanbook.row(candidate.row).to_vec(),
                id_loan: candidate.id_loan.clone(),
                level: candidate.level.clone(),
                id_2dii: id_registry.assign(&candidate.level, &entry.name),
                sector: candidate.sector.clone(),
                sector_abcd: entry.sector.clone(),
                name: candidate.name.clone(),
                name_abcd: entry.name.clone(),
                score,
                source: MatchSource::Loanbook,
                borderline: candidate.borderline,
            });
        }
    }

    if rows.is_empty() {
        warnings.push(MatchWarning::NoMatch);
    }

    if let Some(rules) = &options.overwrite {
        overwrite::apply_overwrites(&mut rows, rules, &mut warnings);
    }

    for warning in &warnings {
        warn!("{}", warning);
    }

    Ok(MatchOutcome {
        loanbook_columns: loanbook.columns().to_vec(),
        rows,
        warnings,
    })
}

fn check_join_columns(loanbook: &Frame, abcd: &Frame, join: &JoinId) -> Result<(), MatchError> {
    if !loanbook.has_column(&join.loanbook) {
        return Err(MatchError::MissingColumns {
            table: "loanbook".to_string(),
            columns: vec![join.loanbook.clone()],
        });
    }
    if !abcd.has_column(&join.abcd) {
        return Err(MatchError::MissingColumns {
            table: "abcd".to_string(),
            columns: vec![join.abcd.clone()],
        });
    }
    Ok(())
}

/// Resolves the per-row sector context, either from caller-supplied columns
/// or through the classification lookup. Unresolved codes produce a warning;
/// a loanbook where nothing resolves is fatal.
fn resolve_row_sectors(
    loanbook: &Frame,
    sector_source: SectorSource,
    options: &MatchOptions,
    warnings: &mut Vec<MatchWarning>,
) -> Result<Vec<Option<(String, bool)>>, MatchError> {
    let mut sectors = Vec::with_capacity(loanbook.len());

    match sector_source {
        SectorSource::Columns => {
            for row in 0..loanbook.len() {
                let sector = loanbook.get(row, "sector");
                let borderline = loanbook.get(row, "borderline");
                match (sector, borderline) {
                    (Some(sector), Some(borderline_text)) => {
                        let borderline =
                            parse_bool(borderline_text).ok_or(MatchError::InvalidValue {
                                column: "borderline".to_string(),
                                row,
                                value: borderline_text.to_string(),
                            })?;
                        sectors.push(Some((sector.to_lowercase(), borderline)));
                    }
                    _ => sectors.push(None),
                }
            }
        }
        SectorSource::Lookup => {
            let bundled;
            let lookup = match &options.sector_lookup {
                Some(lookup) => lookup,
                None => {
                    bundled = SectorLookup::bundled();
                    &bundled
                }
            };

            let mut unresolved = Vec::new();
            for row in 0..loanbook.len() {
                let system = loanbook.get(row, "sector_classification_system");
                let code = loanbook.get(row, "sector_classification_direct_loantaker");
                let resolved = match (system, code) {
                    (Some(system), Some(code)) => lookup
                        .resolve(system, code)
                        .map(|(sector, borderline)| (sector.to_string(), borderline)),
                    _ => None,
                };

                if resolved.is_none() {
                    let label = format!(
                        "{}:{}",
                        system.unwrap_or("?"),
                        code.unwrap_or("?")
                    );
                    if !unresolved.contains(&label) {
                        unresolved.push(label);
                    }
                }
                sectors.push(resolved);
            }

            if loanbook.len() > 0 && sectors.iter().all(|s| s.is_none()) {
                return Err(MatchError::NoSectorResolved);
            }
            if !unresolved.is_empty() {
                warnings.push(MatchWarning::UnresolvedSectorCodes { codes: unresolved });
            }
        }
    }

    Ok(sectors)
}

/// Deduplicates the ABCD table into match entries. Fully duplicate rows are
/// collapsed without comment; sector labels are lowercased.
fn collect_abcd(abcd: &Frame, join: Option<&JoinId>) -> Vec<AbcdEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for row in 0..abcd.len() {
        let Some(name) = abcd.get(row, "name_company") else {
            continue;
        };
        let sector = abcd.get(row, "sector").unwrap_or("").to_lowercase();
        let join_value = join
            .and_then(|j| abcd.get(row, &j.abcd))
            .map(|v| v.to_string());

        let key = (name.to_string(), sector.clone(), join_value.clone());
        if !seen.insert(key) {
            continue;
        }

        entries.push(AbcdEntry {
            alias: crate::alias::to_alias(name),
            name: name.to_string(),
            sector,
            join_value,
        });
    }

    entries
}

/// Explicit identifier join. A hit scores 1 and bypasses fuzzy scoring.
fn identifier_join(
    candidate: &Candidate,
    entries: &[AbcdEntry],
    options: &MatchOptions,
    loanbook: &Frame,
) -> Vec<(usize, f64)> {
    let Some(join) = &options.join_id else {
        return Vec::new();
    };

    // A per-level id column joins on the candidate's own id; any other
    // column applies the loan row's value to every level.
    let level_id_field = format!("id_{}", candidate.level);
    let value = if join.loanbook == level_id_field {
        Some(candidate.id.as_str())
    } else {
        loanbook.get(candidate.row, &join.loanbook)
    };
    let Some(value) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.join_value.as_deref() == Some(value))
        .map(|(index, _)| (index, 1.0))
        .collect()
}

/// Fuzzy join on normalized aliases. Keeps pairs at or above the minimum
/// score; a perfect match discards every non-perfect pair for the candidate.
fn fuzzy_join(
    candidate: &Candidate,
    entries: &[AbcdEntry],
    options: &MatchOptions,
) -> Vec<(usize, f64)> {
    let mut scored = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        if options.by_sector && entry.sector != candidate.sector {
            continue;
        }
        let score = options.method.score(&candidate.alias, &entry.alias);
        if score >= options.min_score {
            scored.push((index, score));
        }
    }

    if scored.iter().any(|(_, score)| *score == 1.0) {
        scored.retain(|(_, score)| *score == 1.0);
    }

    scored
}

/// Assigns synthetic match identifiers: a level-class prefix (DL, IPk, UP)
/// plus a sequence number, stable per matched company within a run.
struct IdRegistry {
    assigned: HashMap<String, HashMap<String, usize>>,
}

impl IdRegistry {
    fn new() -> Self {
        IdRegistry {
            assigned: HashMap::new(),
        }
    }

    fn assign(&mut self, level: &str, company: &str) -> String {
        let prefix = level_prefix(level);
        let per_prefix = self.assigned.entry(prefix.clone()).or_default();
        let next = per_prefix.len() + 1;
        let sequence = *per_prefix.entry(company.to_string()).or_insert(next);
        format!("{}{}", prefix, sequence)
    }
}

fn level_prefix(level: &str) -> String {
    if level.contains("direct") {
        "DL".to_string()
    } else if level.contains("ultimate") {
        "UP".to_string()
    } else {
        let suffix: String = level
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("IP{}", suffix)
    }
}

// ============================================================================
// TESTS
// ============================================================================
