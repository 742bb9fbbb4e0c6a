use crate::truststore::TrustStore;
use std::collections::HashSet;

/// Expected aliases absent from the store, in the caller's order.
///
/// Aliases are compared exactly as the container reports them.
pub fn missing_aliases<'a>(store: &TrustStore, expected: &'a [String]) -> Vec<&'a str> {
    let present: HashSet<&str> = store.aliases().into_iter().collect();
    let mut seen = HashSet::new();

    expected
        .iter()
        .map(String::as_str)
        .filter(|alias| !present.contains(*alias))
        .filter(|alias| seen.insert(*alias))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::CertificateAuthority;
    use crate::truststore::StoreFormat;

    fn store() -> TrustStore {
        let ca = CertificateAuthority::new("Expectation Root");
        TrustStore::new(
            "memory",
            StoreFormat::Jks,
            vec![
                ("sectigo".to_owned(), ca.entry()),
                ("usertrust".to_owned(), ca.entry()),
            ],
        )
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn full_coverage_is_empty() {
        let expected = strings(&["usertrust", "sectigo"]);
        assert!(missing_aliases(&store(), &expected).is_empty());
    }

    #[test]
    fn absent_alias_is_reported_once() {
        let expected = strings(&["nosis", "sectigo", "nosis"]);
        assert_eq!(missing_aliases(&store(), &expected), vec!["nosis"]);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let expected = strings(&["Sectigo"]);
        assert_eq!(missing_aliases(&store(), &expected), vec!["Sectigo"]);
    }

    #[test]
    fn empty_expectation_is_trivially_met() {
        assert!(missing_aliases(&store(), &[]).is_empty());
    }
}
