//! Suite Specializer
//!
//! Test logic is written once against [`DatabaseCapability`]. Each
//! [`TestModule`] turns a capability into a [`TestGroup`]; [`specialize`]
//! binds the standard four modules to one [`Connector`] and wraps the groups
//! in a labeled [`Suite`]. Binding never runs a test.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{BackendError, Connection, Connector};
use crate::descriptor::{BackendTag, DialectFlags};
use crate::suite::{CaseFailure, Suite, TestGroup};
use crate::types::{select_literals_sql, Row, SqlValue};

pub mod concurrency;
pub mod connection;
pub mod generic;
pub mod query;
pub mod type_mapping;

pub use generic::generic_suite;

// ============================================================================
// CAPABILITY CONTRACT
// ============================================================================

/// What a test module may ask of a backend: fresh handles plus the dialect
/// flags that gate backend-specific branches.
pub trait DatabaseCapability: Send + Sync {
    fn kind(&self) -> &BackendTag;
    fn dialect_flags(&self) -> &DialectFlags;
    fn connect(&self) -> Result<Box<dyn Connection>, BackendError>;
}

impl DatabaseCapability for Connector {
    fn kind(&self) -> &BackendTag {
        Connector::kind(self)
    }

    fn dialect_flags(&self) -> &DialectFlags {
        Connector::dialect_flags(self)
    }

    fn connect(&self) -> Result<Box<dyn Connection>, BackendError> {
        Connector::connect(self)
    }
}

/// Abstract test logic, parameterized over a capability.
pub trait TestModule: Send + Sync {
    fn name(&self) -> &'static str;
    fn bind(&self, db: Arc<dyn DatabaseCapability>) -> TestGroup;
}

/// The fixed module set every connector is tested with.
pub fn standard_modules() -> Vec<Box<dyn TestModule>> {
    vec![
        Box::new(connection::ConnectionModule),
        Box::new(query::QueryModule),
        Box::new(type_mapping::TypeMappingModule),
        Box::new(concurrency::ConcurrencyModule::default()),
    ]
}

// ============================================================================
// SPECIALIZATION
// ============================================================================

/// Binds the standard modules to `connector`.
pub fn specialize(connector: Connector, label: &str) -> Suite {
    specialize_with(Arc::new(connector), label, &standard_modules())
}

/// Binds `modules` to `db`, one group per module, in order.
pub fn specialize_with(db: Arc<dyn DatabaseCapability>, label: &str, modules: &[Box<dyn TestModule>]) -> Suite {
    debug!(label, kind = %db.kind(), modules = modules.len(), "specializing suite");
    let mut suite = Suite::new(label);
    for module in modules {
        suite.push_group(module.bind(Arc::clone(&db)));
    }
    suite
}

// ============================================================================
// SHARED CASE HELPERS
// ============================================================================

/// Sends `values` as a literal `SELECT` and returns the single row.
pub(crate) fn select_row(
    conn: &mut dyn Connection,
    values: &[SqlValue],
    db: &dyn DatabaseCapability,
) -> Result<Row, CaseFailure> {
    let sql = select_literals_sql(values, db.dialect_flags().primary());
    let mut rows = conn.query(&sql)?;
    if rows.len() != 1 {
        return Err(CaseFailure::Assertion(format!(
            "{}: expected 1 row, got {}",
            sql,
            rows.len()
        )));
    }
    Ok(rows.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{adapt, DriverRegistry};
    use crate::descriptor::{ConnectionDescriptor, DialectFlag};
    use crate::suite::run_suite;

    fn loopback(flags: DialectFlags) -> Connector {
        let desc = ConnectionDescriptor::with_flags("loopback", vec![], flags);
        adapt(&desc, &DriverRegistry::with_builtin())
    }

    #[test]
    fn specialize_yields_one_group_per_module() {
        for kind in ["loopback", "postgresql", "odbc-driver"] {
            let desc = ConnectionDescriptor::with_flags(kind, vec![], DialectFlags::default());
            let suite = specialize(adapt(&desc, &DriverRegistry::new()), "lbl");
            let names: Vec<_> = suite.groups().map(TestGroup::name).collect();
            assert_eq!(names, ["connection", "query", "type-mapping", "concurrency"]);
            assert_eq!(suite.label(), "lbl");
        }
    }

    #[test]
    fn loopback_suite_passes() {
        let flags = DialectFlags::new([DialectFlag::Sqlite, DialectFlag::Oracle]);
        let outcome = run_suite(&specialize(loopback(flags), "self"));
        assert!(outcome.is_success(), "{:#?}", outcome.results);
        assert!(outcome.passed > 0);
    }

    #[test]
    fn missing_driver_fails_cases_not_binding() {
        let desc = ConnectionDescriptor::with_flags("mysql", vec![], DialectFlags::default());
        let suite = specialize(adapt(&desc, &DriverRegistry::new()), "m");
        let outcome = run_suite(&suite);
        assert_eq!(outcome.passed, 0);
        assert!(outcome.results.iter().all(|r| !r.is_pass()));
    }
}
