//! Connection lifecycle checks.

use std::sync::Arc;

use crate::modules::{DatabaseCapability, TestModule};
use crate::suite::{check, TestGroup};

pub struct ConnectionModule;

impl TestModule for ConnectionModule {
    fn name(&self) -> &'static str {
        "connection"
    }

    fn bind(&self, db: Arc<dyn DatabaseCapability>) -> TestGroup {
        let open = Arc::clone(&db);
        let close = Arc::clone(&db);
        let independent = Arc::clone(&db);
        let closed_query = db;

        TestGroup::new(self.name())
            .case("connect", move || {
                let conn = open.connect()?;
                check(conn.is_connected(), "fresh handle reports disconnected")
            })
            .case("disconnect", move || {
                let mut conn = close.connect()?;
                conn.disconnect()?;
                check(!conn.is_connected(), "handle still connected after disconnect")
            })
            .case("independent-handles", move || {
                let mut first = independent.connect()?;
                let second = independent.connect()?;
                first.disconnect()?;
                check(second.is_connected(), "closing one handle closed another")
            })
            .case("query-after-disconnect-fails", move || {
                let mut conn = closed_query.connect()?;
                conn.disconnect()?;
                check(
                    conn.query("SELECT 1").is_err(),
                    "query on a closed handle succeeded",
                )
            })
    }
}
