//! Parallel handles against one backend.
//!
//! Every worker opens its own handle; nothing is shared across threads except
//! the result sink.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::modules::{select_row, DatabaseCapability, TestModule};
use crate::suite::{check_eq, CaseFailure, TestGroup};
use crate::types::SqlValue;

pub struct ConcurrencyModule {
    workers: usize,
}

impl ConcurrencyModule {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for ConcurrencyModule {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TestModule for ConcurrencyModule {
    fn name(&self) -> &'static str {
        "concurrency"
    }

    fn bind(&self, db: Arc<dyn DatabaseCapability>) -> TestGroup {
        let workers = self.workers;
        let parallel = Arc::clone(&db);
        let churn = db;

        TestGroup::new(self.name())
            .case("parallel-selects", move || {
                let seen = Mutex::new(Vec::with_capacity(workers));
                run_workers(workers, |id| {
                    let mut conn = parallel.connect()?;
                    let value = SqlValue::Integer(id as i64);
                    let row = select_row(&mut *conn, std::slice::from_ref(&value), &*parallel)?;
                    check_eq("worker row", &vec![value], &row)?;
                    seen.lock().push(id);
                    Ok(())
                })?;
                let mut seen = seen.into_inner();
                seen.sort_unstable();
                check_eq("workers finished", &(0..workers).collect::<Vec<_>>(), &seen)
            })
            .case("connect-churn", move || {
                let closed = Mutex::new(0usize);
                run_workers(workers, |_| {
                    for _ in 0..3 {
                        let mut conn = churn.connect()?;
                        conn.disconnect()?;
                        *closed.lock() += 1;
                    }
                    Ok(())
                })?;
                check_eq("handles closed", &(workers * 3), &closed.into_inner())
            })
    }
}

/// Runs `task` on `count` scoped threads and returns the first failure.
fn run_workers<F>(count: usize, task: F) -> Result<(), CaseFailure>
where
    F: Fn(usize) -> Result<(), CaseFailure> + Sync,
{
    thread::scope(|scope| {
        let task = &task;
        let handles: Vec<_> = (0..count)
            .map(|id| scope.spawn(move || task(id)))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(CaseFailure::Panic("worker thread panicked".into())))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    })
}
