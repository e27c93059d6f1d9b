use super::Builder;
use crate::compile::Compiled;
use crate::error::OrmResult;

impl Builder {
    /// `DELETE FROM table WHERE ... [RETURNING ...]`.
    pub(super) fn delete_sql(&self, compiled: &Compiled) -> OrmResult<String> {
        self.require_where(compiled.has_where())?;

        let mut sql = format!("DELETE FROM {}", self.quoted_table());
        if compiled.has_where() {
            sql.push(' ');
            sql.push_str(&compiled.where_clause);
        }
        sql.push_str(&self.returning_clause());
        Ok(sql)
    }
}
