//! Free-text place name normalization.
//!
//! [`normalize`] turns a raw cell value ("123 Bixby Rd St. Johnsbury VT 05819")
//! into the key used against the alias table ("saint johnsbury"). The rules
//! run as one pass that is repeated until the text stops changing, so the
//! result is a fixed point and normalizing it again is a no-op.

use std::sync::OnceLock;

use regex::Regex;

/// Upper bound on rule passes. Every pass after the first either removes text
/// or is the last one, so real inputs settle in two or three.
const MAX_PASSES: usize = 32;

/// Postal and unit noise that precedes a unit designator.
///
/// Longer alternatives come first: the regex engine prefers the leftmost
/// alternative, and `garage apt` must win over `garage`.
const NOISE_WORDS: &[&str] = &[
    "garage apt",
    "po box",
    "star rt",
    "apt",
    "unit",
    "ste",
    "suite",
    "box",
    "bx",
    "b0x",
    "rd",
    "rr",
    "rfd",
    "rt",
    "lot",
    "bldg",
    "rm",
    "pmb",
    "unt",
    "un",
    "u",
    "smc",
    "condo",
    "flr",
    "floor",
    "garage",
];

/// Noise words that also appear glued to their number (`apt101`).
const CONCATENATED_NOISE: &[&str] = &["po box", "apt", "unit", "unt", "un", "bx", "ste", "box", "b0x"];

const STREET_SUFFIXES: &[&str] = &[
    "rd", "ave", "dr", "ln", "ct", "pl", "blvd", "pkwy", "hwy", "rte", "route",
];

struct Rules {
    abbreviations: Vec<(Regex, &'static str)>,
    directionals: Vec<(Regex, &'static str)>,
    state_zip: Regex,
    noise: Regex,
    concatenated_noise: Regex,
    leading_fragments: Regex,
    care_of: Regex,
    street_suffix: Regex,
    whitespace: Regex,
}

fn compile(pattern: &str) -> Regex {
    // Patterns are compile-time constants; a failure here is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid normalization rule '{pattern}': {e}"))
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| {
        let abbreviations = [
            ("st", "saint "),
            ("mt", "mount "),
            ("vtg", "village "),
            ("ft", "fort "),
            ("jct", "junction "),
        ]
        .into_iter()
        .map(|(abbr, full)| (compile(&format!(r"\b{abbr}(?:\.|\s+)")), full))
        .collect();

        let directionals = [("n", "north "), ("s", "south "), ("e", "east "), ("w", "west ")]
            .into_iter()
            .map(|(abbr, full)| (compile(&format!(r"^{abbr}(?:\.|\s+|$)")), full))
            .collect();

        let noise = NOISE_WORDS.join("|");
        let concatenated = CONCATENATED_NOISE.join("|");
        let suffixes = STREET_SUFFIXES.join("|");

        Rules {
            abbreviations,
            directionals,
            state_zip: compile(r"\bvt\s*\d{5}(?:-\d{4})?\b"),
            // Designator: contains a digit, or is a single letter.
            noise: compile(&format!(
                r"^(?:{noise})(?:\s*#\s*|\s+#?\s*)(?:[a-z0-9-]*\d[a-z0-9-]*|[a-z])\b"
            )),
            concatenated_noise: compile(&format!(r"^(?:{concatenated})\d+[a-z]?\b")),
            leading_fragments: compile(r"^(?:\S*[\d-]\S*\s+)+"),
            care_of: compile(r"^%[a-z]+\s+"),
            street_suffix: compile(&format!(r"\b\w+\s+(?:{suffixes})\b")),
            whitespace: compile(r"\s+"),
        }
    })
}

fn apply_pass(rules: &Rules, input: &str) -> String {
    let mut s = input.trim().to_lowercase();

    for (re, full) in &rules.abbreviations {
        s = re.replace_all(&s, *full).into_owned();
    }
    for (re, full) in &rules.directionals {
        s = re.replace(&s, *full).into_owned();
    }

    s = rules.state_zip.replace_all(&s, "").into_owned();

    s = rules.noise.replace(&s, "").into_owned();
    s = rules.concatenated_noise.replace(&s, "").trim_start().to_string();

    s = rules.leading_fragments.replace(&s, "").into_owned();
    s = rules.care_of.replace(&s, "").into_owned();
    s = rules.street_suffix.replace_all(&s, "").into_owned();

    rules.whitespace.replace_all(&s, " ").trim().to_string()
}

/// Normalizes a raw place name into an alias lookup key.
///
/// Never fails; empty or whitespace-only input yields the empty string.
///
/// # Examples
///
/// ```
/// use townmatch::normalize::normalize;
///
/// assert_eq!(normalize("  St. Johnsbury "), "saint johnsbury");
/// assert_eq!(normalize("PERU VT 05152"), "peru");
/// assert_eq!(normalize("APT 4B 12 Main St Burlington"), "main saint burlington");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    let rules = rules();
    let mut current = apply_pass(rules, raw);
    for _ in 1..MAX_PASSES {
        let next = apply_pass(rules, &current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// The lookup key before any rule runs: trimmed and lower-cased.
#[must_use]
pub fn raw_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
    }

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize("  MONTPELIER  "), "montpelier");
    }

    #[test]
    fn expands_abbreviations() {
        assert_eq!(normalize("St. Albans"), "saint albans");
        assert_eq!(normalize("st albans"), "saint albans");
        assert_eq!(normalize("Mt. Holly"), "mount holly");
        assert_eq!(normalize("Jct. City"), "junction city");
        assert_eq!(normalize("Vtg. Essex"), "village essex");
    }

    #[test]
    fn abbreviation_needs_word_boundary() {
        // "east" ends in "st" but the abbreviation is anchored at a word start.
        assert_eq!(normalize("Eastfield"), "eastfield");
        assert_eq!(normalize("Stowe"), "stowe");
    }

    #[test]
    fn expands_leading_directional() {
        assert_eq!(normalize("N. Hero"), "north hero");
        assert_eq!(normalize("s burlington"), "south burlington");
        assert_eq!(normalize("W"), "west");
        assert_eq!(normalize("e.montpelier"), "east montpelier");
    }

    #[test]
    fn directional_only_at_start() {
        assert_eq!(normalize("Hero N"), "hero n");
    }

    #[test]
    fn strips_state_and_zip() {
        assert_eq!(normalize("Peru VT 05152"), "peru");
        assert_eq!(normalize("peru vt05152-1234"), "peru");
    }

    #[test]
    fn strips_noise_prefix() {
        assert_eq!(normalize("APT 4 Jericho"), "jericho");
        assert_eq!(normalize("unit #12b Essex"), "essex");
        assert_eq!(normalize("po box 55 Craftsbury"), "craftsbury");
        assert_eq!(normalize("RR 1 Danville"), "danville");
        assert_eq!(normalize("apt b Jericho"), "jericho");
    }

    #[test]
    fn strips_concatenated_noise() {
        assert_eq!(normalize("APT101 Jericho"), "jericho");
        assert_eq!(normalize("box12b Craftsbury"), "craftsbury");
    }

    #[test]
    fn noise_word_does_not_eat_place_names() {
        assert_eq!(normalize("Underhill"), "underhill");
        assert_eq!(normalize("Unity"), "unity");
        assert_eq!(normalize("Lowell"), "lowell");
    }

    #[test]
    fn strips_leading_numbers() {
        assert_eq!(normalize("105 Island Pond"), "island pond");
        assert_eq!(normalize("12-b 3 Waterbury"), "waterbury");
    }

    #[test]
    fn strips_care_of_marker() {
        assert_eq!(normalize("%BOLIN RUTLAND"), "rutland");
    }

    #[test]
    fn strips_street_suffix_with_preceding_word() {
        assert_eq!(normalize("BIXBY RD Rutland"), "rutland");
        assert_eq!(normalize("12 Elm Ave Barre"), "barre");
    }

    #[test]
    fn leaves_plain_names_alone() {
        for name in ["burlington", "barre", "saint johnsbury", "north hero"] {
            assert_eq!(normalize(name), name);
        }
    }

    #[test]
    fn is_idempotent_on_layered_noise() {
        let inputs = [
            "APT 4 UNIT 5 Jericho",
            "12 34 N. Hero",
            "%c/o 12 main rd st albans",
            "box 1 box 2 box 3 danby",
            "n",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input}");
        }
    }

    #[test]
    fn raw_key_only_trims_and_lowercases() {
        assert_eq!(raw_key("  St. Albans "), "st. albans");
    }
}
