use super::Builder;
use crate::compile::{Compiled, compile};
use crate::error::{OrmError, OrmResult};
use crate::statement::{Method, Statement};

impl Builder {
    /// `SELECT cols FROM table WHERE ... ORDER BY ... LIMIT n OFFSET m`.
    ///
    /// The column list is `*` unless `fields`/`exclude` narrowed it.
    pub(super) fn select_sql(&self, compiled: &Compiled) -> OrmResult<String> {
        let projection = if self.include.is_empty() && self.exclude.is_empty() {
            "*".to_string()
        } else {
            let columns: Vec<&str> = self
                .selected_columns()
                .into_iter()
                .map(|(_, column)| column)
                .collect();
            if columns.is_empty() {
                return Err(OrmError::validation(format!(
                    "SELECT from {} has no columns left after fields/exclude",
                    self.table
                )));
            }
            columns.join(", ")
        };

        let mut sql = format!("SELECT {projection} FROM {}", self.quoted_table());
        if compiled.has_where() {
            sql.push(' ');
            sql.push_str(&compiled.where_clause);
        }

        let order: Vec<&str> = self
            .order_by
            .iter()
            .chain(&compiled.order_by)
            .map(String::as_str)
            .collect();
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(","));
        }
        if self.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", self.limit));
        }
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        Ok(sql)
    }

    /// `SELECT count(column) FROM table WHERE ...`.
    pub fn count_sql(&self, column: &str) -> OrmResult<Statement> {
        if let Some(err) = &self.error {
            return Err(err.replicate());
        }
        let mut params = self.params.clone();
        let compiled = compile(&self.conds, &self.columns, &mut params, self.bind_mode)?;

        let mut sql = format!("SELECT count({column}) FROM {}", self.quoted_table());
        if compiled.has_where() {
            sql.push(' ');
            sql.push_str(&compiled.where_clause);
        }
        Ok(Statement::new(Method::Select, sql, None, params, true))
    }

    /// `SELECT jsonb_agg(row) FROM (<select>) row`: all rows as one JSON array.
    pub fn jsonb_list_sql(&self) -> OrmResult<Statement> {
        Ok(self.build()?.aggregate("jsonb_agg(row)"))
    }

    /// `SELECT jsonb_object_agg(k, v) FROM (<select>) row`: rows folded into one JSON object.
    pub fn jsonb_map_sql(&self, keys: &[&str]) -> OrmResult<Statement> {
        if keys.is_empty() {
            return Err(OrmError::validation("jsonb_object_agg needs a key and a value"));
        }
        let projection = format!("jsonb_object_agg({})", keys.join(","));
        Ok(self.build()?.aggregate(&projection))
    }
}
