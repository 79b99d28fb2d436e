//! Connection descriptors: the concrete, backend-specific specification a
//! data-source name stands for.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Extension key carrying the dialect flag list.
pub const TEST_FLAGS_EXTENSION: &str = "db:test";

/// Backend kind tag as written in a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BackendTag(String);

impl BackendTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One connection parameter. Order is significant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConnectArg {
    Positional(ArgValue),
    Keyword { key: String, value: ArgValue },
}

impl ConnectArg {
    pub fn keyword(key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        ConnectArg::Keyword {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn positional(value: impl Into<ArgValue>) -> Self {
        ConnectArg::Positional(value.into())
    }
}

/// Scalar value of a connection parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Text(s)
    }
}

impl From<f64> for ArgValue {
    fn from(n: f64) -> Self {
        ArgValue::Number(n)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => write!(f, "{:?}", s),
            ArgValue::Number(n) => write!(f, "{}", n),
            ArgValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Opaque extension value; only `db:test` is interpreted by the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    Flags(DialectFlags),
    Text(String),
    List(Vec<String>),
}

/// Dialect tag selecting backend-specific test branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectFlag {
    Postgresql,
    Mysql,
    Sqlite,
    Oracle,
    Db2,
}

impl DialectFlag {
    pub const ALL: [DialectFlag; 5] = [
        DialectFlag::Postgresql,
        DialectFlag::Mysql,
        DialectFlag::Sqlite,
        DialectFlag::Oracle,
        DialectFlag::Db2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectFlag::Postgresql => "postgresql",
            DialectFlag::Mysql => "mysql",
            DialectFlag::Sqlite => "sqlite",
            DialectFlag::Oracle => "oracle",
            DialectFlag::Db2 => "db2",
        }
    }
}

impl fmt::Display for DialectFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgresql" | "postgres" | "ispg" => Ok(DialectFlag::Postgresql),
            "mysql" | "ismy" => Ok(DialectFlag::Mysql),
            "sqlite" | "sqlite3" | "issl" => Ok(DialectFlag::Sqlite),
            "oracle" | "isora" => Ok(DialectFlag::Oracle),
            "db2" | "isdb2" => Ok(DialectFlag::Db2),
            other => Err(format!("unknown dialect flag '{}'", other)),
        }
    }
}

/// Ordered set of dialect flags. Empty means "run no dialect-specific
/// branches", never "run all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DialectFlags(Vec<DialectFlag>);

impl DialectFlags {
    pub fn new(flags: impl IntoIterator<Item = DialectFlag>) -> Self {
        let mut set = Vec::new();
        for flag in flags {
            if !set.contains(&flag) {
                set.push(flag);
            }
        }
        Self(set)
    }

    pub fn contains(&self, flag: DialectFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = DialectFlag> + '_ {
        self.0.iter().copied()
    }

    /// Dialect used to render SQL: the first flag as written.
    pub fn primary(&self) -> Option<DialectFlag> {
        self.0.first().copied()
    }
}

impl fmt::Display for DialectFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.0.iter().map(|d| d.as_str()).collect();
        write!(f, "({})", names.join(" "))
    }
}

/// A concrete connection specification. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionDescriptor {
    kind: BackendTag,
    arguments: Vec<ConnectArg>,
    extensions: BTreeMap<String, ExtensionValue>,
}

impl ConnectionDescriptor {
    pub fn new(
        kind: BackendTag,
        arguments: Vec<ConnectArg>,
        extensions: BTreeMap<String, ExtensionValue>,
    ) -> Self {
        Self {
            kind,
            arguments,
            extensions,
        }
    }

    /// Shorthand for in-memory registries: a kind plus dialect flags.
    pub fn with_flags(kind: &str, arguments: Vec<ConnectArg>, flags: DialectFlags) -> Self {
        let mut extensions = BTreeMap::new();
        extensions.insert(TEST_FLAGS_EXTENSION.to_string(), ExtensionValue::Flags(flags));
        Self::new(BackendTag::new(kind), arguments, extensions)
    }

    pub fn kind(&self) -> &BackendTag {
        &self.kind
    }

    pub fn arguments(&self) -> &[ConnectArg] {
        &self.arguments
    }

    pub fn extension(&self, key: &str) -> Option<&ExtensionValue> {
        self.extensions.get(key)
    }

    /// The `db:test` dialect flags, empty when the extension is absent.
    pub fn test_flags(&self) -> DialectFlags {
        match self.extensions.get(TEST_FLAGS_EXTENSION) {
            Some(ExtensionValue::Flags(flags)) => flags.clone(),
            _ => DialectFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_long_and_short_names() {
        assert_eq!("ispg".parse::<DialectFlag>(), Ok(DialectFlag::Postgresql));
        assert_eq!("sqlite3".parse::<DialectFlag>(), Ok(DialectFlag::Sqlite));
        assert_eq!("isdb2".parse::<DialectFlag>(), Ok(DialectFlag::Db2));
        assert!("mssql".parse::<DialectFlag>().is_err());
    }

    #[test]
    fn flags_deduplicate_and_keep_order() {
        let flags = DialectFlags::new([DialectFlag::Mysql, DialectFlag::Postgresql, DialectFlag::Mysql]);
        assert_eq!(flags.iter().collect::<Vec<_>>(), vec![DialectFlag::Mysql, DialectFlag::Postgresql]);
        assert_eq!(flags.primary(), Some(DialectFlag::Mysql));
        assert_eq!(flags.to_string(), "(mysql postgresql)");
    }

    #[test]
    fn missing_test_extension_means_no_flags() {
        let desc = ConnectionDescriptor::new(BackendTag::new("sqlite3"), vec![], BTreeMap::new());
        assert!(desc.test_flags().is_empty());
    }
}
