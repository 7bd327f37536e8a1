// Sector classification lookup
// Maps a (classification system, code) pair to a sector and a borderline
// flag. A bundled reference table ships with the crate; callers may inject
// their own through MatchOptions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bundled reference table (NACE / SIC / ISIC subset).
const BUNDLED_TABLE: &str = include_str!("../data/sector_classifications.csv");

/// One row of a classification reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorClassification {
    /// Classification system label, e.g. "NACE". Compared exactly.
    pub system: String,
    /// Classification code. Compared case-insensitively.
    pub code: String,
    /// Sector the code maps to, stored lowercased.
    pub sector: String,
    /// True when the code maps to the sector only approximately.
    pub borderline: bool,
}

/// Lookup table from (system, code) to (sector, borderline).
#[derive(Debug, Clone)]
pub struct SectorLookup {
    entries: HashMap<(String, String), (String, bool)>,
}

impl SectorLookup {
    /// The table bundled with the crate.
    pub fn bundled() -> Self {
        let mut rdr = csv::Reader::from_reader(BUNDLED_TABLE.as_bytes());
        let classifications: Vec<SectorClassification> = rdr
            .deserialize()
            .collect::<Result<_, _>>()
            .expect("bundled sector classification table is valid CSV");
        Self::from_classifications(classifications)
    }

    pub fn from_classifications<I>(classifications: I) -> Self
    where
        I: IntoIterator<Item = SectorClassification>,
    {
        let mut entries = HashMap::new();
        for c in classifications {
            entries.insert(
                (c.system, c.code.to_lowercase()),
                (c.sector.to_lowercase(), c.borderline),
            );
        }
        SectorLookup { entries }
    }

    /// Resolve a code to (sector, borderline). The code is matched
    /// case-insensitively, the system label exactly.
    pub fn resolve(&self, system: &str, code: &str) -> Option<(&str, bool)> {
        self.entries
            .get(&(system.to_string(), code.to_lowercase()))
            .map(|(sector, borderline)| (sector.as_str(), *borderline))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SectorLookup {
    fn default() -> Self {
        Self::bundled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_table_loads() {
        let lookup = SectorLookup::bundled();
        assert!(!lookup.is_empty());
        assert_eq!(lookup.resolve("NACE", "3511"), Some(("power", false)));
        assert_eq!(lookup.resolve("SIC", "1311"), Some(("oil and gas", false)));
    }

    #[test]
    fn test_code_is_case_insensitive_system_is_exact() {
        let lookup = SectorLookup::from_classifications(vec![SectorClassification {
            system: "NACE".to_string(),
            code: "35a".to_string(),
            sector: "Power".to_string(),
            borderline: true,
        }]);

        assert_eq!(lookup.resolve("NACE", "35A"), Some(("power", true)));
        assert_eq!(lookup.resolve("nace", "35a"), None);
    }

    #[test]
    fn test_unknown_code_resolves_to_none() {
        let lookup = SectorLookup::bundled();
        assert_eq!(lookup.resolve("NACE", "9999"), None);
        assert_eq!(lookup.resolve("NOT_A_SYSTEM", "3511"), None);
    }

    #[test]
    fn test_borderline_codes() {
        let lookup = SectorLookup::bundled();
        // Higher-level codes map approximately.
        assert_eq!(lookup.resolve("NACE", "35"), Some(("power", true)));
        assert_eq!(lookup.resolve("NACE", "3512"), Some(("power", true)));
    }
}
