use super::Builder;
use crate::compile::Compiled;
use crate::error::{OrmError, OrmResult};
use crate::param::ParamBag;
use crate::value::Value;

impl Builder {
    /// `UPDATE table SET a=:a, ... WHERE ... [RETURNING ...]`.
    ///
    /// The primary key column is never assigned. When explicit `set_field`
    /// overrides exist and no field list was given, only the overrides are set.
    pub(super) fn update_sql(&self, compiled: &Compiled, params: &mut ParamBag) -> OrmResult<String> {
        self.require_where(compiled.has_where())?;

        let pk = self.columns.primary_key();
        let overrides_only = !self.set_fields.is_empty() && self.include.is_empty();
        let mut assignments = Vec::new();

        if !overrides_only {
            for (logical, column) in self.selected_columns() {
                if Some(logical) == pk || self.set_fields.iter().any(|(f, _)| f == logical) {
                    continue;
                }
                if self.accept_value(logical, params) {
                    assignments.push(format!("{column}={}", self.value_ref(logical, params)));
                }
            }
        }
        for (field, value) in &self.set_fields {
            if let Some(column) = self.columns.column(field) {
                let rendered = match value {
                    Value::Null => "NULL".to_string(),
                    v => v.to_literal(),
                };
                assignments.push(format!("{column}={rendered}"));
            }
        }

        if assignments.is_empty() {
            return Err(OrmError::validation(format!(
                "UPDATE of {} has no assignable fields",
                self.table
            )));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.quoted_table(),
            assignments.join(", ")
        );
        if compiled.has_where() {
            sql.push(' ');
            sql.push_str(&compiled.where_clause);
        }
        sql.push_str(&self.returning_clause());
        Ok(sql)
    }
}
