// Manual overwrite injection
// Merges a caller-supplied correction table into the matched output. Rules
// are keyed on (level, id_2dii); an applied rule always wins, but replacing
// a value that disagrees with the match produces a warning.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchWarning};
use crate::frame::Frame;
use crate::matching::{MatchRow, MatchSource};

/// One manual correction, keyed on (level, id_2dii).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverwriteRule {
    pub level: String,
    pub id_2dii: String,
    /// Replacement canonical name.
    pub name: String,
    /// Replacement sector.
    pub sector: String,
    /// Replacement source tag, normally "manual".
    pub source: String,
}

impl OverwriteRule {
    /// Reads rules from a frame with level, id_2dii, name and sector columns.
    /// A source column is optional and defaults to "manual".
    pub fn from_frame(frame: &Frame) -> Result<Vec<OverwriteRule>, MatchError> {
        let missing: Vec<String> = ["level", "id_2dii", "name", "sector"]
            .iter()
            .filter(|c| !frame.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MatchError::MissingColumns {
                table: "overwrite".to_string(),
                columns: missing,
            });
        }

        let mut rules = Vec::new();
        for row in 0..frame.len() {
            rules.push(OverwriteRule {
                level: frame.get(row, "level").unwrap_or("").to_string(),
                id_2dii: frame.get(row, "id_2dii").unwrap_or("").to_string(),
                name: frame.get(row, "name").unwrap_or("").to_string(),
                sector: frame.get(row, "sector").unwrap_or("").to_string(),
                source: frame.get(row, "source").unwrap_or("manual").to_string(),
            });
        }
        Ok(rules)
    }
}

/// Applies every rule to the rows it keys. Replaces name, sector and source,
/// and forces score = 1.
pub fn apply_overwrites(
    rows: &mut [MatchRow],
    rules: &[OverwriteRule],
    warnings: &mut Vec<MatchWarning>,
) {
    for rule in rules {
        let mut applied = 0;
        let mut conflicted = false;

        for row in rows
            .iter_mut()
            .filter(|r| r.level == rule.level && r.id_2dii == rule.id_2dii)
        {
            if row.name != rule.name || row.sector != rule.sector {
                conflicted = true;
            }
            row.name = rule.name.clone();
            row.sector = rule.sector.clone();
            row.source = MatchSource::parse(&rule.source);
            row.score = 1.0;
            applied += 1;
        }

        if applied == 0 {
            debug!(
                "Overwrite rule for level `{}`, id_2dii `{}` matched no rows",
                rule.level, rule.id_2dii
            );
        } else if conflicted {
            warnings.push(MatchWarning::OverwriteConflict {
                level: rule.level.clone(),
                id_2dii: rule.id_2dii.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn match_row(level: &str, id_2dii: &str, name: &str, score: f64) -> MatchRow {
        MatchRow {
            source_row: vec![Some("L1".to_string())],
            id_loan: "L1".to_string(),
            level: level.to_string(),
            id_2dii: id_2dii.to_string(),
            sector: "power".to_string(),
            sector_abcd: "power".to_string(),
            name: name.to_string(),
            name_abcd: name.to_string(),
            score,
            source: MatchSource::Loanbook,
            borderline: false,
        }
    }

    #[test]
    fn test_overwrite_replaces_and_forces_score() {
        let mut rows = vec![match_row("direct_loantaker", "DL1", "Acme Powr", 0.93)];
        let rules = vec![OverwriteRule {
            level: "direct_loantaker".to_string(),
            id_2dii: "DL1".to_string(),
            name: "Acme Power".to_string(),
            sector: "power".to_string(),
            source: "manual".to_string(),
        }];
        let mut warnings = Vec::new();

        apply_overwrites(&mut rows, &rules, &mut warnings);

        assert_eq!(rows[0].name, "Acme Power");
        assert_eq!(rows[0].score, 1.0);
        assert_eq!(rows[0].source, MatchSource::Manual);
        // The name disagreed with the match, so the conflict is reported.
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_agreeing_overwrite_does_not_warn() {
        let mut rows = vec![match_row("direct_loantaker", "DL1", "Acme Power", 0.93)];
        let rules = vec![OverwriteRule {
            level: "direct_loantaker".to_string(),
            id_2dii: "DL1".to_string(),
            name: "Acme Power".to_string(),
            sector: "power".to_string(),
            source: "manual".to_string(),
        }];
        let mut warnings = Vec::new();

        apply_overwrites(&mut rows, &rules, &mut warnings);

        assert_eq!(rows[0].score, 1.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_rule_for_absent_key_is_ignored() {
        let mut rows = vec![match_row("direct_loantaker", "DL1", "Acme Power", 0.93)];
        let rules = vec![OverwriteRule {
            level: "ultimate_parent".to_string(),
            id_2dii: "UP9".to_string(),
            name: "Elsewhere".to_string(),
            sector: "steel".to_string(),
            source: "manual".to_string(),
        }];
        let mut warnings = Vec::new();

        apply_overwrites(&mut rows, &rules, &mut warnings);

        assert_eq!(rows[0].name, "Acme Power");
        assert!(rows[0].score < 1.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_from_frame_requires_key_columns() {
        let csv = "level,id_2dii\ndirect_loantaker,DL1\n";
        let frame = Frame::from_csv_reader(Cursor::new(csv)).unwrap();
        let err = OverwriteRule::from_frame(&frame).unwrap_err();
        assert!(matches!(err, MatchError::MissingColumns { .. }));
    }

    #[test]
    fn test_from_frame_defaults_source_to_manual() {
        let csv = "level,id_2dii,name,sector\ndirect_loantaker,DL1,Acme Power,power\n";
        let frame = Frame::from_csv_reader(Cursor::new(csv)).unwrap();
        let rules = OverwriteRule::from_frame(&frame).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].source, "manual");
    }
}
