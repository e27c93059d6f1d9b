//! Engine configuration.

use crate::compile::BindMode;
use crate::resolve::Resolver;
use crate::trace::SqlLog;

/// Target database dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Driver {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

impl Driver {
    /// Table names are double-quoted on Postgres only.
    pub fn quote_table(self, name: &str) -> String {
        match self {
            Driver::Postgres => format!("\"{name}\""),
            Driver::MySql | Driver::Sqlite => name.to_string(),
        }
    }

    pub fn supports_returning(self) -> bool {
        matches!(self, Driver::Postgres)
    }
}

/// Configuration shared by every builder created from one [`Orm`](crate::Orm).
///
/// Set once at startup and treated as read-only afterwards.
#[derive(Debug, Clone)]
pub struct OrmConfig {
    /// Dialect: table quoting and RETURNING support.
    pub driver: Driver,
    /// Tag key carrying the physical column (`db = "user_name,pk"`).
    pub column_key: String,
    /// Tag key carrying the logical identifier (`json = "userName"`).
    pub ident_key: String,
    /// Default bind mode of new builders.
    pub bind_mode: BindMode,
    /// Log every compiled statement.
    pub sql_log: Option<SqlLog>,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Postgres,
            column_key: "db".to_string(),
            ident_key: "json".to_string(),
            bind_mode: BindMode::Named,
            sql_log: None,
        }
    }
}

impl OrmConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn driver(mut self, driver: Driver) -> Self {
        self.driver = driver;
        self
    }

    /// Set the tag key read for column names.
    pub fn column_key(mut self, key: impl Into<String>) -> Self {
        self.column_key = key.into();
        self
    }

    /// Set the tag key read for logical identifiers.
    pub fn ident_key(mut self, key: impl Into<String>) -> Self {
        self.ident_key = key.into();
        self
    }

    pub fn bind_mode(mut self, mode: BindMode) -> Self {
        self.bind_mode = mode;
        self
    }

    /// Log every statement with the given settings.
    pub fn sql_log(mut self, log: SqlLog) -> Self {
        self.sql_log = Some(log);
        self
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::new(&self.column_key, &self.ident_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_tables_for_postgres_only() {
        assert_eq!(Driver::Postgres.quote_table("users"), "\"users\"");
        assert_eq!(Driver::MySql.quote_table("users"), "users");
        assert!(!Driver::Sqlite.supports_returning());
    }

    #[test]
    fn builder_style_setters() {
        let cfg = OrmConfig::new()
            .driver(Driver::MySql)
            .column_key("col")
            .bind_mode(BindMode::Literal);
        assert_eq!(cfg.driver, Driver::MySql);
        assert_eq!(cfg.column_key, "col");
        assert_eq!(cfg.ident_key, "json");
        assert_eq!(cfg.bind_mode, BindMode::Literal);
        assert!(cfg.sql_log.is_none());
    }
}
