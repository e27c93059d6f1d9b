//! Compiled statements and their execution.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::named::to_positional;
use crate::param::ParamBag;
use crate::row::FromRow;
use crate::value::Value;
use std::fmt;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Insert,
    Update,
    Select,
    Delete,
    /// Caller-provided SQL
    Raw,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Insert => "INSERT",
            Method::Update => "UPDATE",
            Method::Select => "SELECT",
            Method::Delete => "DELETE",
            Method::Raw => "RAW",
        }
    }

    /// Whether zero affected rows counts as a failure.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Method::Select)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `WITH name AS (<statement>)` wrapping of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithClause {
    pub table: String,
    /// `name.col [DESC]` entries for the outer query.
    pub order_by: Vec<String>,
}

impl WithClause {
    fn order_clause(&self) -> Option<String> {
        (!self.order_by.is_empty()).then(|| format!("ORDER BY {}", self.order_by.join(",")))
    }
}

/// Statement text plus the parameter bag bound against its `:name` markers.
#[derive(Debug, Clone)]
pub struct Statement {
    method: Method,
    sql: String,
    with: Option<WithClause>,
    params: ParamBag,
    allow_no_rows: bool,
}

impl Statement {
    pub fn new(
        method: Method,
        sql: String,
        with: Option<WithClause>,
        params: ParamBag,
        allow_no_rows: bool,
    ) -> Self {
        Self {
            method,
            sql,
            with,
            params,
            allow_no_rows,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Statement text without the `WITH` wrapping.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    pub fn with_clause(&self) -> Option<&WithClause> {
        self.with.as_ref()
    }

    /// `WITH name AS (<sql>)`, when wrapping was requested.
    pub fn with_prefix(&self) -> Option<String> {
        self.with
            .as_ref()
            .map(|w| format!("WITH {} AS ({})", w.table, self.sql))
    }

    /// The executable text: the statement itself, or its `WITH` wrapping.
    pub fn full_sql(&self) -> String {
        match (&self.with, self.with_prefix()) {
            (Some(with), Some(prefix)) => {
                let mut sql = format!("{prefix} SELECT * FROM {}", with.table);
                if let Some(order) = with.order_clause() {
                    sql.push(' ');
                    sql.push_str(&order);
                }
                sql
            }
            _ => self.sql.clone(),
        }
    }

    /// A derived statement over `SELECT <projection> FROM (...) row`.
    ///
    /// `projection` is the aggregate, e.g. `jsonb_agg(row)`.
    pub(crate) fn aggregate(&self, projection: &str) -> Statement {
        let sql = match (&self.with, self.with_prefix()) {
            (Some(with), Some(prefix)) => match with.order_clause() {
                Some(order) => format!(
                    "{prefix} SELECT {projection} FROM (SELECT * FROM {} {order}) row",
                    with.table
                ),
                None => format!("{prefix} SELECT {projection} FROM {} row", with.table),
            },
            _ => format!("SELECT {projection} FROM ({}) row", self.sql),
        };
        Statement::new(Method::Select, sql, None, self.params.clone(), true)
    }

    /// Driver form: `$1..$N` text and the values in index order.
    pub fn to_positional(&self) -> OrmResult<(String, Vec<Value>)> {
        to_positional(&self.full_sql(), &self.params)
    }

    // ==================== Execution ====================

    /// Execute without the zero-rows check.
    pub(crate) async fn execute_unchecked(&self, conn: &impl GenericClient) -> OrmResult<u64> {
        let (sql, values) = self.to_positional()?;
        let params = params_ref(&values);
        conn.execute(&sql, &params).await
    }

    /// Execute and return the affected row count.
    ///
    /// A mutation affecting zero rows is [`OrmError::NoRowsAffected`] unless
    /// the builder called `allow_no_rows()`.
    pub async fn execute(&self, conn: &impl GenericClient) -> OrmResult<u64> {
        let affected = self.execute_unchecked(conn).await?;
        if affected == 0 && self.method.is_mutation() && !self.allow_no_rows {
            return Err(OrmError::NoRowsAffected);
        }
        Ok(affected)
    }

    pub async fn fetch_all(&self, conn: &impl GenericClient) -> OrmResult<Vec<Row>> {
        let (sql, values) = self.to_positional()?;
        let params = params_ref(&values);
        conn.query(&sql, &params).await
    }

    /// Fetch the first row; zero rows is [`OrmError::NotFound`].
    pub async fn fetch_one(&self, conn: &impl GenericClient) -> OrmResult<Row> {
        let (sql, values) = self.to_positional()?;
        let params = params_ref(&values);
        conn.query_one(&sql, &params).await
    }

    pub async fn fetch_opt(&self, conn: &impl GenericClient) -> OrmResult<Option<Row>> {
        let (sql, values) = self.to_positional()?;
        let params = params_ref(&values);
        conn.query_opt(&sql, &params).await
    }

    pub async fn fetch_all_as<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<Vec<T>> {
        let rows = self.fetch_all(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    pub async fn fetch_one_as<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<T> {
        let row = self.fetch_one(conn).await?;
        T::from_row(&row)
    }

    pub async fn fetch_opt_as<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<Option<T>> {
        let row = self.fetch_opt(conn).await?;
        row.as_ref().map(T::from_row).transpose()
    }
}

fn params_ref(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}
