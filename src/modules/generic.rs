//! Backend-independent suite.
//!
//! Exercises the pure literal mapping in `types` for every dialect. Needs no
//! connector, so it runs even when no label is requested.

use crate::descriptor::DialectFlag;
use crate::suite::{check, check_eq, CaseFailure, Suite, TestGroup};
use crate::types::{expected_roundtrip, parse_literal, render_literal, select_literals_sql, split_select_list, SqlValue};

pub const GENERIC_LABEL: &str = "generic";

fn samples() -> Vec<SqlValue> {
    vec![
        SqlValue::Null,
        SqlValue::Integer(i64::MIN),
        SqlValue::Integer(0),
        SqlValue::Real(-0.125),
        SqlValue::Real(1e300),
        SqlValue::Text(String::new()),
        SqlValue::Text("a 'quoted', list".into()),
        SqlValue::Bool(false),
        SqlValue::Bytes(Vec::new()),
        SqlValue::Bytes(vec![0xca, 0xfe]),
    ]
}

fn dialects() -> impl Iterator<Item = Option<DialectFlag>> {
    std::iter::once(None).chain(DialectFlag::ALL.into_iter().map(Some))
}

fn dialect_name(dialect: Option<DialectFlag>) -> &'static str {
    dialect.map_or("portable", |d| d.as_str())
}

/// Literal parse of each rendered sample, normalized the way a backend
/// without booleans would store it.
fn literal_roundtrip(dialect: Option<DialectFlag>) -> Result<(), CaseFailure> {
    for value in samples() {
        let literal = render_literal(&value, dialect);
        let parsed = parse_literal(&literal).map_err(CaseFailure::Assertion)?;
        let stored = expected_roundtrip(&parsed, dialect);
        check_eq(&literal, &expected_roundtrip(&value, dialect), &stored)?;
    }
    Ok(())
}

fn select_list_roundtrip(dialect: Option<DialectFlag>) -> Result<(), CaseFailure> {
    let values = samples();
    let sql = select_literals_sql(&values, dialect);
    let list = sql
        .strip_prefix("SELECT ")
        .ok_or_else(|| CaseFailure::Assertion(format!("not a select: {}", sql)))?;
    let list = match dialect {
        Some(DialectFlag::Oracle) => list.trim_end_matches(" FROM DUAL"),
        Some(DialectFlag::Db2) => list.trim_end_matches(" FROM SYSIBM.SYSDUMMY1"),
        _ => list,
    };
    check_eq("column count", &values.len(), &split_select_list(list).len())
}

pub fn generic_suite() -> Suite {
    let mut literals = TestGroup::new("literals");
    let mut selects = TestGroup::new("select-lists");
    for dialect in dialects() {
        let name = dialect_name(dialect);
        literals = literals.case(name, move || literal_roundtrip(dialect));
        selects = selects.case(name, move || select_list_roundtrip(dialect));
    }

    let booleans = TestGroup::new("booleans")
        .case("native", || {
            check(
                render_literal(&SqlValue::Bool(true), Some(DialectFlag::Postgresql)) == "TRUE",
                "postgresql should spell booleans natively",
            )
        })
        .case("emulated", || {
            for dialect in [DialectFlag::Sqlite, DialectFlag::Oracle, DialectFlag::Db2] {
                check_eq(
                    dialect.as_str(),
                    &SqlValue::Integer(1),
                    &expected_roundtrip(&SqlValue::Bool(true), Some(dialect)),
                )?;
            }
            Ok(())
        });

    let flags = TestGroup::new("dialect-flags").case("aliases", || {
        for (alias, flag) in [
            ("ispg", DialectFlag::Postgresql),
            ("ismy", DialectFlag::Mysql),
            ("issl", DialectFlag::Sqlite),
            ("isora", DialectFlag::Oracle),
            ("isdb2", DialectFlag::Db2),
        ] {
            let parsed = alias
                .parse::<DialectFlag>()
                .map_err(|e| CaseFailure::Assertion(e.to_string()))?;
            check_eq(alias, &flag, &parsed)?;
        }
        Ok(())
    });

    let mut suite = Suite::new(GENERIC_LABEL);
    suite.push_group(literals);
    suite.push_group(selects);
    suite.push_group(booleans);
    suite.push_group(flags);
    suite
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::run_suite;

    #[test]
    fn generic_suite_passes() {
        let outcome = run_suite(&generic_suite());
        assert!(outcome.is_success(), "{:#?}", outcome.results);
        assert_eq!(outcome.label, GENERIC_LABEL);
    }
}
