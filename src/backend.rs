//! Backend Adapter Factory
//!
//! Turns a [`ConnectionDescriptor`] into a [`Connector`]: a canonical backend
//! tag, the dialect flags, and a deferred `connect` thunk. Building a
//! connector has no side effects; nothing is dialed until a test asks for a
//! handle.
//!
//! Real drivers live outside this crate and plug in through [`Driver`]. The
//! only built-in one is [`loopback`], which needs no server.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::descriptor::{BackendTag, ConnectArg, ConnectionDescriptor, DialectFlags};
use crate::types::Row;

pub mod loopback;

// ============================================================================
// BACKEND CONTRACT
// ============================================================================

/// Failures raised by backends. The core passes these through unclassified.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no driver registered for backend '{0}'")]
    NoDriver(BackendTag),
    #[error("connection refused: {0}")]
    Connect(String),
    #[error("query failed: {message} (sql: {sql})")]
    Query { sql: String, message: String },
    #[error("connection is closed")]
    Disconnected,
}

/// A live backend handle.
pub trait Connection: Send {
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, BackendError>;
    fn is_connected(&self) -> bool;
    fn disconnect(&mut self) -> Result<(), BackendError>;
}

/// Opens connections for one backend kind.
pub trait Driver: Send + Sync {
    fn open(&self, args: &[ConnectArg]) -> Result<Box<dyn Connection>, BackendError>;
}

/// Canonical backend tag → driver.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<BackendTag, Arc<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only the built-in loopback driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(loopback::TAG, Arc::new(loopback::LoopbackDriver));
        registry
    }

    /// Registers a driver under the canonical form of `tag`.
    pub fn register(&mut self, tag: &str, driver: Arc<dyn Driver>) {
        self.drivers.insert(canonical_tag(&BackendTag::new(tag)), driver);
    }

    pub fn get(&self, tag: &BackendTag) -> Option<Arc<dyn Driver>> {
        self.drivers.get(tag).cloned()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.drivers.keys()).finish()
    }
}

// ============================================================================
// CONNECTOR
// ============================================================================

/// Zero-argument connect operation.
pub type ConnectFn = Arc<dyn Fn() -> Result<Box<dyn Connection>, BackendError> + Send + Sync>;

/// A resolved, backend-bound connection factory. Never mutated after
/// construction; each call to [`Connector::connect`] opens a fresh handle.
#[derive(Clone)]
pub struct Connector {
    kind: BackendTag,
    dialect_flags: DialectFlags,
    connect: ConnectFn,
}

impl Connector {
    pub fn new(kind: BackendTag, dialect_flags: DialectFlags, connect: ConnectFn) -> Self {
        Self {
            kind,
            dialect_flags,
            connect,
        }
    }

    pub fn kind(&self) -> &BackendTag {
        &self.kind
    }

    pub fn dialect_flags(&self) -> &DialectFlags {
        &self.dialect_flags
    }

    pub fn connect(&self) -> Result<Box<dyn Connection>, BackendError> {
        (self.connect)()
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("kind", &self.kind)
            .field("dialect_flags", &self.dialect_flags)
            .finish_non_exhaustive()
    }
}

/// Maps a descriptor's kind to the tag drivers are registered under.
/// Driver-managed ODBC collapses into plain `odbc`; everything else passes
/// through unchanged.
pub fn canonical_tag(kind: &BackendTag) -> BackendTag {
    match kind.as_str() {
        "odbc-driver" => BackendTag::new("odbc"),
        _ => kind.clone(),
    }
}

/// Builds a connector for one descriptor.
pub fn adapt(descriptor: &ConnectionDescriptor, drivers: &DriverRegistry) -> Connector {
    let kind = canonical_tag(descriptor.kind());
    let flags = descriptor.test_flags();
    debug!(kind = %kind, flags = %flags, "adapting descriptor");

    let driver = drivers.get(&kind);
    let args: Arc<[ConnectArg]> = descriptor.arguments().into();
    let missing = kind.clone();
    let connect: ConnectFn = Arc::new(move || match &driver {
        Some(driver) => driver.open(&args),
        None => Err(BackendError::NoDriver(missing.clone())),
    });

    Connector::new(kind, flags, connect)
}
