//! Jaro-Winkler string similarity.
//!
//! The fuzzy acceptance threshold is tuned against this exact formulation
//! (greedy first-available matching inside the window, prefix boost only above
//! 0.7), so it is implemented here rather than taken from a general-purpose
//! string metric crate whose edge cases differ.

/// Prefix length cap for the Winkler boost.
const MAX_PREFIX: usize = 4;

/// Winkler scaling factor.
const PREFIX_SCALE: f64 = 0.1;

/// Jaro score above which the prefix boost applies.
const BOOST_THRESHOLD: f64 = 0.7;

/// Jaro-Winkler similarity in `[0.0, 1.0]`, computed over Unicode scalar values.
///
/// # Examples
///
/// ```
/// use townmatch::similarity::jaro_winkler;
///
/// assert_eq!(jaro_winkler("montpelier", "montpelier"), 1.0);
/// assert_eq!(jaro_winkler("", "montpelier"), 0.0);
/// assert!(jaro_winkler("burlington", "burlingten") > 0.85);
/// ```
#[must_use]
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let s1: Vec<char> = a.chars().collect();
    let s2: Vec<char> = b.chars().collect();
    jaro_winkler_chars(&s1, &s2)
}

/// [`jaro_winkler`] over pre-split characters, for callers that compare one
/// key against many candidates.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn jaro_winkler_chars(s1: &[char], s2: &[char]) -> f64 {
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }
    if s1 == s2 {
        return 1.0;
    }

    // May be -1 for single-character inputs, which leaves an empty window.
    let range = (s1.len().max(s2.len()) / 2) as isize - 1;
    let last = s2.len() as isize - 1;

    let mut s1_matched = vec![false; s1.len()];
    let mut s2_matched = vec![false; s2.len()];
    let mut m = 0usize;

    for (i, &c) in s1.iter().enumerate() {
        let i = i as isize;
        let low = if i >= range { i - range } else { 0 };
        let high = (i + range).min(last);
        let mut j = low;
        while j <= high {
            let ju = j as usize;
            if !s2_matched[ju] && c == s2[ju] {
                m += 1;
                s1_matched[i as usize] = true;
                s2_matched[ju] = true;
                break;
            }
            j += 1;
        }
    }

    if m == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut k = 0usize;
    for (i, &c) in s1.iter().enumerate() {
        if !s1_matched[i] {
            continue;
        }
        while k < s2.len() {
            let j = k;
            k += 1;
            if s2_matched[j] {
                if c != s2[j] {
                    transpositions += 1;
                }
                break;
            }
        }
    }

    let m = m as f64;
    let t = transpositions as f64;
    let jaro = (m / s1.len() as f64 + m / s2.len() as f64 + (m - t / 2.0) / m) / 3.0;

    if jaro <= BOOST_THRESHOLD {
        return jaro;
    }

    let prefix = s1
        .iter()
        .zip(s2.iter())
        .take(MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + prefix as f64 * PREFIX_SCALE * (1.0 - jaro)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(jaro_winkler("Montpelier", "Montpelier"), 1.0);
        assert_eq!(jaro_winkler("a", "a"), 1.0);
    }

    #[test]
    fn empty_scores_zero() {
        assert_eq!(jaro_winkler("", ""), 0.0);
        assert_eq!(jaro_winkler("", "barre"), 0.0);
        assert_eq!(jaro_winkler("barre", ""), 0.0);
    }

    #[test]
    fn single_characters_have_no_window() {
        assert_eq!(jaro_winkler("a", "b"), 0.0);
    }

    #[test]
    fn classic_reference_values() {
        // MARTHA / MARHTA: m = 6, t = 2, jaro = 0.9444..., l = 3.
        assert!(close(jaro_winkler("martha", "marhta"), 0.961_111_111_111_111_1));
        // DWAYNE / DUANE: m = 4, t = 0, jaro = 0.8222..., l = 1.
        assert!(close(jaro_winkler("dwayne", "duane"), 0.84));
        // DIXON / DICKSONX: jaro = 0.7666..., l = 2.
        assert!(close(jaro_winkler("dixon", "dicksonx"), 0.813_333_333_333_333_3));
    }

    #[test]
    fn one_character_typo_clears_threshold() {
        let score = jaro_winkler("burlington", "burlingten");
        assert!(score > 0.85, "score = {score}");
    }

    #[test]
    fn different_names_score_low() {
        assert!(jaro_winkler("stowe", "rutland") < 0.7);
    }

    #[test]
    fn no_boost_below_threshold() {
        // Shared prefix but jaro stays under 0.7, so no boost is applied.
        let score = jaro_winkler("abcxyzqrs", "abcdefghi");
        assert!(close(score, (3.0 / 9.0 + 3.0 / 9.0 + 1.0) / 3.0));
    }

    #[test]
    fn symmetric_on_town_pairs() {
        let pairs = [
            ("burlington", "burlingten"),
            ("montpelier", "montpeleir"),
            ("saint albans", "st albans"),
            ("barre city", "barre town"),
            ("dwayne", "duane"),
            ("waterbury", "waterbury center"),
        ];
        for (a, b) in pairs {
            assert_eq!(jaro_winkler(a, b), jaro_winkler(b, a), "{a} / {b}");
        }
    }

    #[test]
    fn bounded() {
        for (a, b) in [("x", "xy"), ("abc", "cba"), ("hartford", "hartland")] {
            let s = jaro_winkler(a, b);
            assert!((0.0..=1.0).contains(&s));
        }
    }
}
