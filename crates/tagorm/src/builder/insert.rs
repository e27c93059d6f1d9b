use super::Builder;
use crate::error::{OrmError, OrmResult};
use crate::param::ParamBag;

impl Builder {
    /// `INSERT INTO table (cols) VALUES (vals) [RETURNING ...]`.
    pub(super) fn insert_sql(&self, params: &mut ParamBag) -> OrmResult<String> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (logical, column) in self.selected_columns() {
            if self.accept_value(logical, params) {
                columns.push(column);
                values.push(self.value_ref(logical, params));
            }
        }
        if columns.is_empty() {
            return Err(OrmError::validation(format!(
                "INSERT into {} has no assignable fields",
                self.table
            )));
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({}){}",
            self.quoted_table(),
            columns.join(", "),
            values.join(", "),
            self.returning_clause()
        ))
    }
}
