//! Literal round trips through the backend.
//!
//! Portable values are always checked. Booleans and byte strings vary by
//! dialect, so one case per dialect flag is added; a connector without flags
//! gets no dialect-specific cases.

use std::sync::Arc;

use crate::descriptor::DialectFlag;
use crate::modules::{select_row, DatabaseCapability, TestModule};
use crate::suite::{check_eq, CaseFailure, TestGroup};
use crate::types::{expected_roundtrip, has_native_bool, select_literals_sql, SqlValue};

pub struct TypeMappingModule;

impl TestModule for TypeMappingModule {
    fn name(&self) -> &'static str {
        "type-mapping"
    }

    fn bind(&self, db: Arc<dyn DatabaseCapability>) -> TestGroup {
        let portable = [
            ("null", SqlValue::Null),
            ("integer", SqlValue::Integer(-9_007_199_254_740_993)),
            ("real", SqlValue::Real(2.5)),
            ("text", SqlValue::Text("O'Reilly".into())),
        ];

        let mut group = TestGroup::new(self.name());
        for (name, value) in portable {
            let db = Arc::clone(&db);
            group = group.case(name, move || {
                let mut conn = db.connect()?;
                let row = select_row(&mut *conn, std::slice::from_ref(&value), &*db)?;
                check_eq(name, &vec![value.clone()], &row)
            });
        }

        for flag in db.dialect_flags().iter() {
            for (name, value) in [
                ("boolean", SqlValue::Bool(true)),
                ("bytes", SqlValue::Bytes(vec![0x00, 0xff, 0x10])),
            ] {
                let db = Arc::clone(&db);
                group = group.case(&format!("{}[{}]", name, flag), move || {
                    roundtrip_in(&*db, flag, &value)
                });
            }
        }
        group
    }
}

/// Sends `value` rendered for `dialect` and compares against what that
/// dialect is expected to hand back.
fn roundtrip_in(db: &dyn DatabaseCapability, dialect: DialectFlag, value: &SqlValue) -> Result<(), CaseFailure> {
    let mut conn = db.connect()?;
    let sql = select_literals_sql(std::slice::from_ref(value), Some(dialect));
    let rows = conn.query(&sql)?;
    let expected = vec![vec![expected_roundtrip(value, Some(dialect))]];
    let actual = rows
        .into_iter()
        .map(|row| row.into_iter().map(|v| normalize(v, dialect)).collect())
        .collect::<Vec<Vec<_>>>();
    check_eq(&sql, &expected, &actual)
}

/// Dialects without a boolean type may echo `TRUE`/`FALSE` back as numbers;
/// both spellings count as the integer the dialect stores.
fn normalize(value: SqlValue, dialect: DialectFlag) -> SqlValue {
    match value {
        SqlValue::Bool(b) if !has_native_bool(Some(dialect)) => SqlValue::Integer(i64::from(b)),
        other => other,
    }
}
