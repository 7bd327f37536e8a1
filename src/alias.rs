// Company name normalization
// Canonicalizes free-text company names so similarity scoring compares like
// with like. Applied identically to loanbook and ABCD names; the original-case
// ABCD name is preserved elsewhere for display.

use regex::Regex;
use std::sync::OnceLock;

/// Legal-entity suffixes stripped from the end of a name, already lowercased
/// and punctuation-free. Multi-token suffixes are handled token by token
/// ("co ltd" falls off as "ltd" then "co").
const LEGAL_SUFFIXES: [&str; 38] = [
    "inc", "incorporated", "corp", "corporation", "company", "co", "llc",
    "llp", "lp", "ltd", "limited", "plc", "sa", "se", "nv", "bv", "ag",
    "gmbh", "kg", "kgaa", "spa", "srl", "sarl", "ab", "as", "asa", "oy",
    "oyj", "pt", "pte", "pty", "bhd", "holding", "holdings", "group", "grp",
    "intl", "international",
];

fn punctuation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9\s]+").unwrap())
}

/// Canonical alias of a company name: lowercased, diacritics folded to ASCII,
/// "&" spelled out, punctuation dropped, trailing legal-entity suffixes
/// removed, whitespace collapsed. Pure and deterministic.
///
/// Periods and apostrophes are deleted rather than replaced with a space so
/// abbreviations stay one token ("S.A." becomes "sa", not "s a").
pub fn to_alias(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let folded: String = lowered.chars().map(fold_diacritic).collect();
    let spelled = folded.replace('&', " and ");
    let glued: String = spelled
        .chars()
        .filter(|c| !matches!(c, '.' | '\'' | '’'))
        .collect();
    let stripped = punctuation_pattern().replace_all(&glued, " ");

    let mut tokens: Vec<&str> = stripped.split_whitespace().collect();
    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1];
        if LEGAL_SUFFIXES.contains(&last) {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ")
}

/// Folds common Latin diacritics to their ASCII base character. Characters
/// outside the table pass through unchanged (and fall to the punctuation
/// filter if non-alphanumeric).
fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => 'i',
        'ł' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' | 'ţ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        'æ' => 'a',
        'œ' => 'o',
        'ß' => 's',
        'đ' => 'd',
        'þ' => 't',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        assert_eq!(to_alias("  Acme   Widgets  "), "acme widgets");
    }

    #[test]
    fn test_strips_punctuation() {
        assert_eq!(to_alias("Acme, Widgets (Holdings) Ltd."), "acme widgets");
    }

    #[test]
    fn test_strips_legal_suffixes() {
        assert_eq!(to_alias("Acme Inc"), "acme");
        assert_eq!(to_alias("Acme Co Ltd"), "acme");
        assert_eq!(to_alias("Acme GmbH"), "acme");
        assert_eq!(to_alias("Acme Pte Ltd"), "acme");
    }

    #[test]
    fn test_suffix_only_name_keeps_last_token() {
        // A name made entirely of suffix words must not normalize to nothing.
        assert_eq!(to_alias("Limited"), "limited");
    }

    #[test]
    fn test_folds_diacritics() {
        assert_eq!(to_alias("Müller Énergie"), "muller energie");
        assert_eq!(to_alias("São Paulo Aço S.A."), "sao paulo aco");
    }

    #[test]
    fn test_spells_out_ampersand() {
        assert_eq!(to_alias("Brown & Sons Co."), "brown and sons");
    }

    #[test]
    fn test_period_abbreviations_stay_one_token() {
        assert_eq!(to_alias("Acme Power S.A."), "acme power");
        assert_eq!(to_alias("A.B.C. Steel"), "abc steel");
        assert_eq!(to_alias("O'Brien Shipping"), "obrien shipping");
    }

    #[test]
    fn test_deterministic_and_idempotent() {
        let once = to_alias("Großkraftwerk Mannheim AG");
        assert_eq!(once, to_alias("Großkraftwerk Mannheim AG"));
        assert_eq!(once, to_alias(&once));
    }
}
