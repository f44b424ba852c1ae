use proptest::prelude::*;
use racedata::odata::{ODataQuery, quote};

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 64,
        .. proptest::test_runner::Config::default()
    })]
    #[test]
    fn prop_query_string_is_empty_or_one_part_per_option(
        select in proptest::collection::vec("[a-z_]{1,12}", 0..4),
        value in proptest::option::of(".{0,24}"),
        top in proptest::option::of(1u32..5_000),
        skip in proptest::option::of(0u32..5_000),
        count in any::<bool>(),
    ) {
        let mut q = ODataQuery::new().select(select.clone());
        if let Some(v) = &value {
            q = q.filter(format!("cr616_trackname eq {}", quote(v)));
        }
        if let Some(top) = top { q = q.top(top); }
        if let Some(skip) = skip { q = q.skip(skip); }
        if count { q = q.with_count(); }

        let qs = q.to_query_string();
        let expected = usize::from(!select.is_empty())
            + usize::from(value.is_some())
            + usize::from(top.is_some())
            + usize::from(skip.is_some())
            + usize::from(count);
        if expected == 0 {
            prop_assert!(qs.is_empty());
        } else {
            prop_assert!(qs.starts_with('?'));
            prop_assert!(!qs.contains('#'));
            prop_assert_eq!(qs[1..].split('&').count(), expected);
        }
        prop_assert_eq!(q.to_query_string(), qs, "rendering is stable");
    }

    #[test]
    fn prop_quote_doubles_single_quotes(v in ".{0,32}") {
        let quoted = quote(&v);
        prop_assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
        let inner = &quoted[1..quoted.len() - 1];
        prop_assert_eq!(inner.replace("''", "'"), v);
    }
}
