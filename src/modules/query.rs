//! Basic query round trips.

use std::sync::Arc;

use crate::modules::{select_row, DatabaseCapability, TestModule};
use crate::suite::{check_eq, TestGroup};
use crate::types::SqlValue;

pub struct QueryModule;

impl TestModule for QueryModule {
    fn name(&self) -> &'static str {
        "query"
    }

    fn bind(&self, db: Arc<dyn DatabaseCapability>) -> TestGroup {
        let cases: [(&str, Vec<SqlValue>); 3] = [
            ("select-constant", vec![SqlValue::Integer(1)]),
            (
                "select-columns",
                vec![SqlValue::Integer(42), SqlValue::Text("dbsuite".into()), SqlValue::Null],
            ),
            ("quoted-text", vec![SqlValue::Text("it's, quoted".into())]),
        ];

        let mut group = TestGroup::new(self.name());
        for (name, values) in cases {
            let db = Arc::clone(&db);
            group = group.case(name, move || {
                let mut conn = db.connect()?;
                let row = select_row(&mut *conn, &values, &*db)?;
                conn.disconnect()?;
                check_eq("row", &values, &row)
            });
        }
        group
    }
}
