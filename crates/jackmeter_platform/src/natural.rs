//! Natural Ordering of Port Names
//!
//! Sorts identifiers so that embedded numbers compare by magnitude:
//! `system:capture_2` comes before `system:capture_10`.
//!
//! Digit runs are compared by length first (no leading-zero
//! normalization), then digit by digit. Everything else compares bytewise.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Appended to both strings so the scan never has to special-case the end
const SENTINEL: u8 = b'$';

#[inline]
fn byte_at(s: &[u8], i: usize) -> u8 {
    s.get(i).copied().unwrap_or(SENTINEL)
}

/// Strict weak ordering: true if `a` sorts before `b`
pub fn natural_less(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let size = a.len().min(b.len()) + 1;

    for i in 0..size {
        let (ai, bi) = (byte_at(a, i), byte_at(b, i));

        if ai.is_ascii_digit() && bi.is_ascii_digit() {
            for n in i..size {
                let (a_digit, b_digit) = (byte_at(a, n).is_ascii_digit(), byte_at(b, n).is_ascii_digit());
                if a_digit != b_digit {
                    // The side whose run ended first has fewer digits
                    return b_digit;
                }
                if !a_digit {
                    break; // same number of digits
                }
            }
        }

        if ai != bi {
            if ai == b'-' && bi.is_ascii_digit() {
                return true; // negative less than implicit positive
            }
            return ai < bi;
        }
    }

    a.len() < b.len()
}

/// Total order derived from [`natural_less`]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    if natural_less(a, b) {
        Ordering::Less
    } else if natural_less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// String wrapper that orders naturally, for use as a set key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey(pub String);

impl NaturalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&str> for NaturalKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NaturalKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Naturally ordered, de-duplicated set of port names
pub type PortSet = BTreeSet<NaturalKey>;

/// Collect port names into a [`PortSet`]
pub fn port_set<I, S>(names: I) -> PortSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(|name| NaturalKey(name.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_numbers_by_magnitude() {
        assert!(natural_less("a2", "a10"));
        assert!(!natural_less("a10", "a2"));
        assert!(natural_less("capture_9", "capture_10"));
    }

    #[test]
    fn test_negative_before_positive() {
        assert!(natural_less("a-1", "a2"));
        assert!(!natural_less("a2", "a-1"));
    }

    #[test]
    fn test_equal_length_numbers_compare_digitwise() {
        assert!(natural_less("x12", "x13"));
        assert!(natural_less("x19b", "x21a"));
        assert!(!natural_less("x13", "x12"));
    }

    #[test]
    fn test_leading_zeros_count_as_digits() {
        // Length first: "007" has more digits than "8"
        assert!(natural_less("8", "007"));
        assert!(natural_less("07", "10"));
    }

    #[test]
    fn test_prefix_is_smaller() {
        assert!(natural_less("system", "system:capture_1"));
        assert!(natural_less("", "a"));
        assert!(!natural_less("a", ""));
    }

    #[test]
    fn test_irreflexive() {
        for s in ["", "a", "a10", "system:playback_2", "-1", "$"] {
            assert!(!natural_less(s, s));
        }
    }

    #[test]
    fn test_non_numeric_falls_back_to_bytes() {
        assert!(natural_less("alpha", "beta"));
        assert!(natural_less("Zeta", "alpha"));
    }

    #[test]
    fn test_port_set_order() {
        let set = port_set([
            "system:capture_10",
            "system:capture_2",
            "system:capture_1",
            "mixer:out_L",
            "system:capture_2",
        ]);
        let ordered: Vec<&str> = set.iter().map(NaturalKey::as_str).collect();
        assert_eq!(
            ordered,
            vec![
                "mixer:out_L",
                "system:capture_1",
                "system:capture_2",
                "system:capture_10",
            ]
        );
    }

    #[test]
    fn test_sort_by_cmp() {
        let mut names = vec!["in_11", "in_3", "in_0", "in_20", "in_-4"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["in_-4", "in_0", "in_3", "in_11", "in_20"]);
    }

    fn identifier() -> impl Strategy<Value = String> {
        // Small alphabet so digit runs, dashes and shared prefixes are common
        proptest::string::string_regex("[a-c0-9:_$!-]{0,8}").unwrap()
    }

    proptest! {
        #[test]
        fn prop_irreflexive(a in identifier()) {
            prop_assert!(!natural_less(&a, &a));
        }

        #[test]
        fn prop_asymmetric(a in identifier(), b in identifier()) {
            prop_assert!(!(natural_less(&a, &b) && natural_less(&b, &a)));
        }

        #[test]
        fn prop_transitive(a in identifier(), b in identifier(), c in identifier()) {
            if natural_less(&a, &b) && natural_less(&b, &c) {
                prop_assert!(natural_less(&a, &c));
            }
        }

        #[test]
        fn prop_equivalence_is_identity(a in identifier(), b in identifier()) {
            if !natural_less(&a, &b) && !natural_less(&b, &a) {
                prop_assert_eq!(a, b);
            }
        }
    }
}
