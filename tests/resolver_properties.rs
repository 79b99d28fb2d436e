mod common;

use dbsuite::descriptor::{ConnectionDescriptor, DialectFlag, DialectFlags};
use dbsuite::errors::{ErrorCategory, ErrorKind, NameTable};
use dbsuite::resolver::{parse_expression, ConfigExpr, NamedConfig, Resolver};
use dbsuite::store::{DataSourceRegistry, DescriptorRegistry, ProfileStore};
use proptest::prelude::*;

fn names(configs: &[NamedConfig]) -> Vec<&str> {
    configs.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn stored_profile_resolves_in_leaf_order() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);

    let configs = resolver.resolve(ConfigExpr::reference("pair")).unwrap();
    assert_eq!(names(&configs), ["x", "z"]);
    assert!(configs[0].descriptor.test_flags().contains(DialectFlag::Sqlite));
    assert_eq!(configs[1].descriptor, sources.lookup_descriptor("z").unwrap());
}

#[test]
fn length_equals_reachable_dsn_leaves() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);

    // deep = (ref pair) + (profile (dsn x) (ref y)) + (dsn x)
    let configs = resolver.resolve(ConfigExpr::reference("deep")).unwrap();
    assert_eq!(names(&configs), ["x", "z", "x", "z", "x"]);
}

#[test]
fn profile_is_concatenation_of_children() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);

    let a = ConfigExpr::reference("pair");
    let b = ConfigExpr::profile([ConfigExpr::dsn("lb"), ConfigExpr::reference("y")]);
    let mut expected = resolver.resolve(a.clone()).unwrap();
    expected.extend(resolver.resolve(b.clone()).unwrap());

    assert_eq!(resolver.resolve(ConfigExpr::profile([a, b])).unwrap(), expected);
}

#[test]
fn ref_equals_resolving_the_stored_expression() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);

    let stored = parse_expression("(profile (dsn x) (ref y))").unwrap();
    assert_eq!(
        resolver.resolve(ConfigExpr::reference("pair")).unwrap(),
        resolver.resolve(stored).unwrap()
    );

    let err = resolver.resolve(ConfigExpr::reference("nobody")).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::UnknownName {
            name: "nobody".into(),
            table: NameTable::Profiles
        }
    );
}

#[test]
fn resolution_is_idempotent() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);
    let first = resolver.resolve(ConfigExpr::reference("deep")).unwrap();
    let second = resolver.resolve(ConfigExpr::reference("deep")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn mutual_recursion_is_reported_not_followed() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);

    let err = resolver.resolve(ConfigExpr::reference("loop-a")).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::CyclicReference {
            chain: vec!["loop-a".into(), "loop-b".into(), "loop-a".into()]
        }
    );
}

#[test]
fn malformed_stored_expression_names_the_value() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);

    let err = resolver.resolve_label("broken").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resolution);
    assert!(err.to_string().contains("(dsn x extra)"), "{}", err);
}

#[test]
fn labels_try_profiles_then_data_sources() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);

    assert_eq!(names(&resolver.resolve_label("y").unwrap()), ["z"]);
    assert_eq!(names(&resolver.resolve_label("pg-real").unwrap()), ["pg-real"]);
    assert_eq!(resolver.resolve_label("ghost").unwrap_err().unknown_name(), Some("ghost"));
}

#[test]
fn already_resolved_lists_bypass_the_stores() {
    let (profiles, sources) = common::stores();
    let resolver = Resolver::new(&profiles, &sources);
    let given = vec![NamedConfig::new("adhoc", sources.lookup_descriptor("lb").unwrap())];
    assert_eq!(resolver.resolve(given.clone()).unwrap(), given);
}

// ============================================================================
// GENERATED STORES
// ============================================================================

const PROPTEST_CASES: u32 = 128;
const PROFILES: usize = 4;
const SOURCES: usize = 3;

/// Expressions over `d0..d2` that may only `ref` profiles `p<first_ref>` and
/// later, so every generated store is acyclic.
fn arb_expr(first_ref: usize) -> BoxedStrategy<ConfigExpr> {
    let dsn = (0..SOURCES).prop_map(|i| ConfigExpr::dsn(format!("d{}", i)));
    let leaf = if first_ref < PROFILES {
        prop_oneof![
            2 => dsn,
            1 => (first_ref..PROFILES).prop_map(|i| ConfigExpr::reference(format!("p{}", i))),
        ]
        .boxed()
    } else {
        dsn.boxed()
    };
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(ConfigExpr::Profile)
    })
    .boxed()
}

/// Profile `p<i>` only refers to profiles after it.
fn arb_profiles() -> Vec<BoxedStrategy<ConfigExpr>> {
    (0..PROFILES).map(|i| arb_expr(i + 1)).collect()
}

fn generated_stores(stored: &[ConfigExpr]) -> (ProfileStore, DataSourceRegistry) {
    let mut profiles = ProfileStore::new();
    for (i, expr) in stored.iter().enumerate() {
        profiles.insert(format!("p{}", i), expr.to_ast());
    }
    let mut sources = DataSourceRegistry::new();
    for i in 0..SOURCES {
        sources.insert(
            format!("d{}", i),
            ConnectionDescriptor::with_flags("loopback", vec![], DialectFlags::default()),
        );
    }
    (profiles, sources)
}

/// Reference walk: the `dsn` leaves reachable depth-first, left to right.
fn dsn_leaves(expr: &ConfigExpr, stored: &[ConfigExpr], out: &mut Vec<String>) {
    match expr {
        ConfigExpr::Profile(children) => children.iter().for_each(|c| dsn_leaves(c, stored, out)),
        ConfigExpr::Ref(name) => {
            let index: usize = name[1..].parse().unwrap();
            dsn_leaves(&stored[index], stored, out);
        }
        ConfigExpr::Dsn(name) => out.push(name.clone()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: PROPTEST_CASES, .. ProptestConfig::default() })]

    #[test]
    fn resolves_to_reachable_leaves_in_order(stored in arb_profiles(), top in arb_expr(0)) {
        let (profiles, sources) = generated_stores(&stored);
        let resolver = Resolver::new(&profiles, &sources);

        let mut expected = Vec::new();
        dsn_leaves(&top, &stored, &mut expected);
        let configs = resolver.resolve(top).unwrap();
        prop_assert_eq!(configs.len(), expected.len());
        prop_assert_eq!(names(&configs), expected);
    }

    #[test]
    fn profile_of_two_is_concatenation(stored in arb_profiles(), a in arb_expr(0), b in arb_expr(0)) {
        let (profiles, sources) = generated_stores(&stored);
        let resolver = Resolver::new(&profiles, &sources);

        let mut expected = resolver.resolve(a.clone()).unwrap();
        expected.extend(resolver.resolve(b.clone()).unwrap());
        prop_assert_eq!(resolver.resolve(ConfigExpr::profile([a, b])).unwrap(), expected);
    }

    #[test]
    fn repeated_resolution_is_stable(stored in arb_profiles(), top in arb_expr(0)) {
        let (profiles, sources) = generated_stores(&stored);
        let resolver = Resolver::new(&profiles, &sources);

        let first = resolver.resolve(top.clone()).unwrap();
        let second = resolver.resolve(top).unwrap();
        prop_assert_eq!(first, second);
    }
}
