//! Statement builder.
//!
//! A [`Builder`] is created from a record (see [`Orm`](crate::Orm)) and
//! configured through `&mut self` fluent calls. [`Builder::build`] compiles a
//! fresh [`Statement`] every time it is called.
//!
//! ## Design
//!
//! - The record is resolved once, at construction: column map and field
//!   values are fixed for the builder's lifetime.
//! - Conditions are deduplicated by content; attaching one twice is a no-op.
//! - Misuse detected by a fluent call (e.g. `with` on a non-SELECT builder)
//!   is stored and returned by `build()` and every terminal call.
//! - UPDATE and DELETE require a WHERE clause unless
//!   [`Builder::allow_unconditional`] was called.

pub mod delete;
pub mod exec;
pub mod insert;
pub mod select;
pub mod update;

use crate::compile::{BindMode, compile};
use crate::condition::{Cond, CondSet};
use crate::config::OrmConfig;
use crate::error::{OrmError, OrmResult};
use crate::named::bind_marker;
use crate::param::ParamBag;
use crate::record::Record;
use crate::resolve::ColumnMap;
use crate::statement::{Method, Statement, WithClause};
use crate::trace::SqlLog;
use crate::value::Value;
use indexmap::IndexSet;
use std::sync::Arc;

/// Dynamic INSERT/UPDATE/SELECT/DELETE builder over one record.
#[derive(Debug)]
pub struct Builder {
    config: Arc<OrmConfig>,
    method: Method,
    /// Unquoted table name
    table: String,
    /// Field values of the record (read-only after construction)
    params: ParamBag,
    columns: ColumnMap,
    conds: CondSet,
    /// Builder-level ORDER BY, placed before condition-level ordering
    order_by: Vec<String>,
    include: IndexSet<String>,
    exclude: IndexSet<String>,
    allow_empty: bool,
    allow_empty_fields: IndexSet<String>,
    /// Explicit `SET` overrides (logical id, value)
    set_fields: Vec<(String, Value)>,
    limit: u64,
    offset: u64,
    /// RETURNING columns (resolved)
    returning: Vec<String>,
    with_table: Option<String>,
    with_order: Vec<String>,
    bind_mode: BindMode,
    allow_unconditional: bool,
    allow_no_rows: bool,
    log: bool,
    raw_sql: Option<String>,
    /// First misuse detected by a fluent call
    error: Option<OrmError>,
}

impl Builder {
    /// Create a builder for `method` on `table`, resolving `record` with the config's tag keys.
    pub fn new(
        config: Arc<OrmConfig>,
        method: Method,
        table: &str,
        record: &dyn Record,
    ) -> Self {
        let (params, columns) = config.resolver().resolve(record);
        let bind_mode = config.bind_mode;
        Self {
            config,
            method,
            table: table.to_string(),
            params,
            columns,
            conds: CondSet::new(),
            order_by: Vec::new(),
            include: IndexSet::new(),
            exclude: IndexSet::new(),
            allow_empty: false,
            allow_empty_fields: IndexSet::new(),
            set_fields: Vec::new(),
            limit: 0,
            offset: 0,
            returning: Vec::new(),
            with_table: None,
            with_order: Vec::new(),
            bind_mode,
            allow_unconditional: false,
            allow_no_rows: false,
            log: false,
            raw_sql: None,
            error: None,
        }
    }

    /// Create a raw statement builder; `params` seeds the bag for `:name` markers.
    pub fn raw(config: Arc<OrmConfig>, sql: &str, params: &dyn Record) -> Self {
        let mut builder = Self::new(config, Method::Raw, "", params);
        if sql.trim().is_empty() {
            builder.fail(OrmError::validation("raw statement has empty SQL"));
        }
        builder.raw_sql = Some(sql.to_string());
        builder
    }

    fn fail(&mut self, err: OrmError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Field values resolved from the record.
    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    /// The error recorded by a fluent call, if any.
    pub fn error(&self) -> Option<&OrmError> {
        self.error.as_ref()
    }

    // ==================== Conditions ====================

    /// Attach a condition. Ignored for INSERT.
    pub fn filter(&mut self, cond: Cond) -> &mut Self {
        if self.method != Method::Insert {
            self.conds.insert(cond);
        }
        self
    }

    /// Attach several conditions.
    pub fn filters(&mut self, conds: impl IntoIterator<Item = Cond>) -> &mut Self {
        for cond in conds {
            self.filter(cond);
        }
        self
    }

    /// Match on the primary key (`db = "col,pk"`). No-op when the record has none.
    pub fn where_pk(&mut self) -> &mut Self {
        if let Some(pk) = self.columns.primary_key() {
            let cond = Cond::and([pk]);
            self.filter(cond);
        }
        self
    }

    // ==================== Field selection ====================

    /// Restrict the statement to these logical fields.
    pub fn fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Leave these logical fields out of the statement.
    pub fn exclude<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Let empty strings take part in INSERT/UPDATE.
    pub fn allow_empty(&mut self, allow: bool) -> &mut Self {
        self.allow_empty = allow;
        self
    }

    /// Let empty strings of these fields take part in INSERT/UPDATE.
    pub fn allow_empty_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_empty_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// UPDATE: set a field to an explicit value, bypassing value validation.
    pub fn set_field(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let field = field.into();
        if self.columns.column(&field).is_some() {
            self.set_fields.push((field, value.into()));
        }
        self
    }

    // ==================== Ordering & paging ====================

    pub fn asc<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            if let Some(column) = self.columns.column(field.as_ref()) {
                self.order_by.push(column.to_string());
            }
        }
        self
    }

    pub fn desc<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            if let Some(column) = self.columns.column(field.as_ref()) {
                self.order_by.push(format!("{column} DESC"));
            }
        }
        self
    }

    /// LIMIT; zero means none.
    pub fn limit(&mut self, rows: u64) -> &mut Self {
        self.limit = rows;
        self
    }

    /// OFFSET; zero means none.
    pub fn offset(&mut self, rows: u64) -> &mut Self {
        self.offset = rows;
        self
    }

    // ==================== Output shaping ====================

    /// Append `RETURNING` with the given logical fields (`"*"` for all columns).
    ///
    /// # Panics
    ///
    /// Panics when the configured driver has no RETURNING support.
    pub fn returning<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        assert!(
            self.config.driver.supports_returning(),
            "RETURNING is not supported by the {:?} driver",
            self.config.driver
        );
        for field in fields {
            let field = field.as_ref();
            if field == "*" {
                self.returning.push("*".to_string());
            } else if let Some(column) = self.columns.column(field) {
                self.returning.push(column.to_string());
            }
        }
        self
    }

    /// Wrap the SELECT as `WITH name AS (...) SELECT * FROM name`.
    pub fn with(&mut self, name: &str) -> &mut Self {
        if self.method != Method::Select {
            self.fail(OrmError::validation(format!(
                "with() requires a SELECT builder, got {}",
                self.method
            )));
        } else if !name.is_empty() {
            self.with_table = Some(name.to_string());
        }
        self
    }

    /// Order the outer `WITH` query by columns of the sub-query.
    pub fn with_asc<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push_with_order(columns, "")
    }

    pub fn with_desc<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push_with_order(columns, " DESC")
    }

    fn push_with_order<I, S>(&mut self, columns: I, suffix: &str) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(table) = self.with_table.clone() else {
            self.fail(OrmError::validation("with_asc/with_desc called before with()"));
            return self;
        };
        for column in columns {
            let column = column.as_ref();
            if !column.is_empty() {
                self.with_order.push(format!("{table}.{column}{suffix}"));
            }
        }
        self
    }

    // ==================== Behaviour switches ====================

    pub fn bind_mode(&mut self, mode: BindMode) -> &mut Self {
        self.bind_mode = mode;
        self
    }

    /// Permit UPDATE/DELETE without any WHERE term.
    pub fn allow_unconditional(&mut self) -> &mut Self {
        self.allow_unconditional = true;
        self
    }

    /// Do not treat zero affected rows as an error.
    pub fn allow_no_rows(&mut self) -> &mut Self {
        self.allow_no_rows = true;
        self
    }

    /// Log the compiled statement.
    pub fn log(&mut self, enabled: bool) -> &mut Self {
        self.log = enabled;
        self
    }

    /// Override the table name.
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.table = name.to_string();
        self
    }

    // ==================== Build ====================

    fn quoted_table(&self) -> String {
        self.config.driver.quote_table(&self.table)
    }

    /// `(logical, column)` pairs after exclude, then include, in field order.
    pub(crate) fn selected_columns(&self) -> Vec<(&str, &str)> {
        self.columns
            .iter()
            .filter(|(_, column)| !column.is_empty())
            .filter(|(logical, _)| !self.exclude.contains(*logical))
            .filter(|(logical, _)| self.include.is_empty() || self.include.contains(*logical))
            .collect()
    }

    /// Whether a value may be written by INSERT/UPDATE; may restage it in `params`.
    fn accept_value(&self, logical: &str, params: &mut ParamBag) -> bool {
        let Some(value) = params.get(logical).cloned() else {
            return false;
        };
        match value {
            Value::Null => false,
            Value::Bool(_) | Value::Int(_) | Value::UInt(_) | Value::Float(_) => true,
            Value::Text(s) => {
                !s.is_empty() || self.allow_empty || self.allow_empty_fields.contains(logical)
            }
            Value::Bytes(b) if b.is_empty() => false,
            Value::Bytes(b) => {
                if let Ok(text) = String::from_utf8(b) {
                    params.insert(logical, Value::Text(text));
                }
                true
            }
            Value::Json(serde_json::Value::Null) => false,
            Value::Json(j) => {
                let text = j.to_string();
                params.insert(logical, Value::Text(text));
                true
            }
        }
    }

    /// Value placeholder for INSERT/UPDATE in the current bind mode.
    fn value_ref(&self, logical: &str, params: &mut ParamBag) -> String {
        match self.bind_mode {
            BindMode::Named => bind_marker(params, logical),
            BindMode::Literal => params
                .get(logical)
                .map(Value::to_literal)
                .unwrap_or_default(),
        }
    }

    fn returning_clause(&self) -> String {
        if self.returning.is_empty() {
            String::new()
        } else {
            format!(" RETURNING {}", self.returning.join(","))
        }
    }

    fn require_where(&self, has_where: bool) -> OrmResult<()> {
        if has_where || self.allow_unconditional {
            return Ok(());
        }
        Err(OrmError::Unconditional(self.method.as_str()))
    }

    /// Compile the current state into a fresh statement.
    pub fn build(&self) -> OrmResult<Statement> {
        if let Some(err) = &self.error {
            return Err(err.replicate());
        }
        let mut params = self.params.clone();

        let compiled = compile(&self.conds, &self.columns, &mut params, self.bind_mode)?;
        let sql = match self.method {
            Method::Insert => self.insert_sql(&mut params)?,
            Method::Update => self.update_sql(&compiled, &mut params)?,
            Method::Select => self.select_sql(&compiled)?,
            Method::Delete => self.delete_sql(&compiled)?,
            Method::Raw => self.raw_sql.clone().unwrap_or_default(),
        };

        let with = self.with_table.as_ref().map(|table| WithClause {
            table: table.clone(),
            order_by: self.with_order.clone(),
        });
        let statement = Statement::new(self.method, sql, with, params, self.allow_no_rows);
        self.emit(&statement);
        Ok(statement)
    }

    fn emit(&self, statement: &Statement) {
        let log = match (&self.config.sql_log, self.log) {
            (Some(log), _) => log.clone(),
            (None, true) => SqlLog::default(),
            (None, false) => return,
        };
        log.emit(
            self.method.as_str(),
            &statement.full_sql(),
            statement.params().len(),
        );
    }
}
