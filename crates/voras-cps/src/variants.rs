//! Candidate key generation
//!
//! For namespace `N`, prefix `P`, suffix `S` and infixes `[I1..In]` the
//! candidates are, most specific first:
//!
//! ```text
//! N.P.I1.I2...In.S
//! N.P.I1.I2...In-1.S
//! ...
//! N.P.I1.S
//! N.P.S
//! ```
//!
//! Duplicate infixes are kept positionally.

use crate::error::{CpsError, CpsResult};

/// Reject infixes that would produce ambiguous keys
///
/// # Errors
/// - `CpsError::EmptyInfix` for an empty or whitespace-only infix
/// - `CpsError::DottedInfix` for an infix containing `.`
pub fn validate_infixes<S: AsRef<str>>(infixes: &[S]) -> CpsResult<()> {
    for (index, infix) in infixes.iter().enumerate() {
        let infix = infix.as_ref();
        if infix.trim().is_empty() {
            return Err(CpsError::EmptyInfix { index });
        }
        if infix.contains('.') {
            return Err(CpsError::DottedInfix {
                infix: infix.to_string(),
            });
        }
    }
    Ok(())
}

/// Candidate keys in decreasing specificity; always `infixes.len() + 1` long
///
/// # Errors
/// Invalid infixes or an empty prefix or suffix
pub fn property_variants<S: AsRef<str>>(
    namespace: &str,
    prefix: &str,
    suffix: &str,
    infixes: &[S],
) -> CpsResult<Vec<String>> {
    if prefix.is_empty() || suffix.is_empty() {
        return Err(CpsError::EmptyName);
    }
    validate_infixes(infixes)?;

    let base = format!("{namespace}.{prefix}");
    Ok((0..=infixes.len())
        .rev()
        .map(|depth| {
            let mut key = base.clone();
            for infix in &infixes[..depth] {
                key.push('.');
                key.push_str(infix.as_ref());
            }
            key.push('.');
            key.push_str(suffix);
            key
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn most_specific_first() {
        let got = property_variants("zos", "image", "credentialid", &["PLEXMA", "MVMA"]).unwrap();
        assert_eq!(
            got,
            vec![
                "zos.image.PLEXMA.MVMA.credentialid",
                "zos.image.PLEXMA.credentialid",
                "zos.image.credentialid",
            ]
        );
    }

    #[test]
    fn no_infixes_is_bare_key() {
        let none: [&str; 0] = [];
        assert_eq!(
            property_variants("zos", "image", "x", &none).unwrap(),
            vec!["zos.image.x"]
        );
    }

    #[test]
    fn duplicates_are_positional() {
        let got = property_variants("zos", "p", "s", &["A", "A"]).unwrap();
        assert_eq!(got, vec!["zos.p.A.A.s", "zos.p.A.s", "zos.p.s"]);
    }

    #[test]
    fn rejects_bad_infixes() {
        assert!(matches!(
            property_variants("zos", "p", "s", &["A", " "]),
            Err(CpsError::EmptyInfix { index: 1 })
        ));
        assert!(matches!(
            property_variants("zos", "p", "s", &["A.B"]),
            Err(CpsError::DottedInfix { .. })
        ));
        assert!(matches!(
            property_variants("zos", "", "s", &["A"]),
            Err(CpsError::EmptyName)
        ));
    }

    proptest! {
        #[test]
        fn variant_count_and_order(infixes in proptest::collection::vec("[A-Z0-9]{1,6}", 0..6)) {
            let got = property_variants("ns", "pre", "suf", &infixes).unwrap();
            prop_assert_eq!(got.len(), infixes.len() + 1);
            prop_assert_eq!(got.last().unwrap(), "ns.pre.suf");
            for pair in got.windows(2) {
                prop_assert!(pair[0].split('.').count() == pair[1].split('.').count() + 1);
            }
        }
    }
}
