//! `tracing`-based statement logging.

use tracing::Level;

/// Emits compiled statements under the `tagorm.sql` target.
///
/// Attach it to an [`OrmConfig`](crate::OrmConfig) to log every statement, or
/// call `log(true)` on a single builder to log just that one.
#[derive(Debug, Clone)]
pub struct SqlLog {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLog {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(500),
        }
    }
}

impl SqlLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    /// Emit one statement event.
    pub fn emit(&self, method: &str, sql: &str, param_count: usize) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate(sql);
        emit_at_level!(
            self.level,
            target: "tagorm.sql",
            method,
            param_count,
            sql = %sql,
        );
    }
}

fn truncate_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
