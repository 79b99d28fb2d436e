//! Built-in `loopback` backend.
//!
//! Answers `SELECT <literal>, ...` (optionally `FROM DUAL` or
//! `FROM SYSIBM.SYSDUMMY1`) with one row echoing the literals. Lets the
//! harness check its own wiring end to end without a database server.
//!
//! Arguments: `(refuse "<reason>")` makes every connect attempt fail.

use crate::backend::{BackendError, Connection, Driver};
use crate::descriptor::{ArgValue, ConnectArg};
use crate::types::{parse_literal, split_select_list, Row};

pub const TAG: &str = "loopback";

const DUMMY_TABLES: [&str; 2] = [" FROM DUAL", " FROM SYSIBM.SYSDUMMY1"];

#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackDriver;

impl Driver for LoopbackDriver {
    fn open(&self, args: &[ConnectArg]) -> Result<Box<dyn Connection>, BackendError> {
        for arg in args {
            if let ConnectArg::Keyword { key, value } = arg {
                if key == "refuse" {
                    let reason = match value {
                        ArgValue::Text(s) => s.clone(),
                        other => other.to_string(),
                    };
                    return Err(BackendError::Connect(reason));
                }
            }
        }
        Ok(Box::new(LoopbackConnection { open: true }))
    }
}

#[derive(Debug)]
pub struct LoopbackConnection {
    open: bool,
}

impl Connection for LoopbackConnection {
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, BackendError> {
        if !self.open {
            return Err(BackendError::Disconnected);
        }
        let fail = |message: &str| BackendError::Query {
            sql: sql.to_string(),
            message: message.to_string(),
        };

        let trimmed = sql.trim().trim_end_matches(';');
        let body = trimmed
            .get(..7)
            .filter(|head| head.eq_ignore_ascii_case("SELECT "))
            .map(|_| &trimmed[7..])
            .ok_or_else(|| fail("loopback only answers SELECT"))?;

        let upper = body.to_ascii_uppercase();
        let list = DUMMY_TABLES
            .iter()
            .find(|table| upper.ends_with(*table))
            .map_or(body, |table| &body[..body.len() - table.len()]);

        let row = split_select_list(list)
            .into_iter()
            .map(parse_literal)
            .collect::<Result<Row, _>>()
            .map_err(|message| fail(&message))?;
        if row.is_empty() {
            return Err(fail("empty select list"));
        }
        Ok(vec![row])
    }

    fn is_connected(&self) -> bool {
        self.open
    }

    fn disconnect(&mut self) -> Result<(), BackendError> {
        if !self.open {
            return Err(BackendError::Disconnected);
        }
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlValue;

    #[test]
    fn echoes_selected_literals() {
        let mut conn = LoopbackDriver.open(&[]).unwrap();
        let rows = conn.query("SELECT 1, 'a', NULL FROM DUAL").unwrap();
        assert_eq!(rows, vec![vec![SqlValue::Integer(1), SqlValue::Text("a".into()), SqlValue::Null]]);
    }

    #[test]
    fn rejects_non_select() {
        let mut conn = LoopbackDriver.open(&[]).unwrap();
        assert!(matches!(conn.query("DELETE FROM t"), Err(BackendError::Query { .. })));
        assert!(conn.query("select").is_err());
    }

    #[test]
    fn closed_connection_refuses_queries() {
        let mut conn = LoopbackDriver.open(&[]).unwrap();
        conn.disconnect().unwrap();
        assert!(!conn.is_connected());
        assert!(matches!(conn.query("SELECT 1"), Err(BackendError::Disconnected)));
    }

    #[test]
    fn refuse_argument_fails_connect() {
        let err = LoopbackDriver
            .open(&[ConnectArg::keyword("refuse", "server down")])
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "connection refused: server down");
    }
}
