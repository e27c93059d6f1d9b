//! Single round-trip pagination.
//!
//! The SELECT is wrapped in a CTE chain that counts all rows and aggregates
//! one window of them into a JSON array:
//!
//! ```text
//! WITH t AS (<select>),
//! t1 AS (SELECT count(*) AS total FROM t),
//! t2 AS (SELECT jsonb_agg(jsonb_build_object('uid',row.uid,...)) list
//!        FROM (SELECT * FROM t LIMIT <size> OFFSET <offset>) row),
//! t3 AS (SELECT t2.*, t1.* FROM t2 CROSS JOIN t1)
//! SELECT * FROM t3
//! ```

use crate::builder::Builder;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::resolve::ColumnMap;
use crate::row::RowExt;
use crate::statement::{Method, Statement};
use crate::value::quote_text;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    /// Rows matching the query, over all pages
    pub total: u64,
    pub total_page: u64,
    /// 1-based page number
    pub page: u64,
    pub page_size: u64,
    pub list: Vec<T>,
}

impl<T> PageResult<T> {
    /// Number of pages for `total` rows (ceiling division).
    pub fn calc_total_page(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }
}

/// `'logical',prefix.column` pairs for `jsonb_build_object`, skipping `ignore`.
pub fn jsonb_object_keys(columns: &ColumnMap, prefix: Option<&str>, ignore: &[&str]) -> String {
    object_keys(columns.iter(), prefix, ignore)
}

fn object_keys<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    prefix: Option<&str>,
    ignore: &[&str],
) -> String {
    let head = prefix
        .filter(|p| !p.is_empty())
        .map(|p| format!("{p}."))
        .unwrap_or_default();
    pairs
        .into_iter()
        .filter(|(logical, column)| !column.is_empty() && !ignore.contains(logical))
        .map(|(logical, column)| format!("{},{head}{column}", quote_text(logical)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Wrap a SELECT statement into the pagination template.
///
/// `page` is 1-based; zero is treated as the first page.
pub fn page_sql(
    select: &Statement,
    projection: &str,
    page_size: u64,
    page: u64,
) -> OrmResult<Statement> {
    if page_size < 1 {
        return Err(OrmError::InvalidPageSize(page_size));
    }
    let offset = page.max(1).saturating_sub(1).saturating_mul(page_size);
    let sql = format!(
        "WITH t AS ({}), \
         t1 AS (SELECT count(*) AS total FROM t), \
         t2 AS (SELECT jsonb_agg(jsonb_build_object({projection})) list FROM (SELECT * FROM t LIMIT {page_size} OFFSET {offset}) row), \
         t3 AS (SELECT t2.*, t1.* FROM t2 CROSS JOIN t1) \
         SELECT * FROM t3",
        select.full_sql()
    );
    Ok(Statement::new(
        Method::Select,
        sql,
        None,
        select.params().clone(),
        true,
    ))
}

impl Builder {
    /// The pagination statement for this SELECT; `ignore` lists logical fields left out of each row.
    pub fn page_sql(&self, page: u64, page_size: u64, ignore: &[&str]) -> OrmResult<Statement> {
        if self.method() != Method::Select {
            return Err(OrmError::validation(format!(
                "pagination requires a SELECT builder, got {}",
                self.method()
            )));
        }
        let select = self.build()?;
        // Only the columns the inner SELECT projects exist on `row`.
        let projection = object_keys(self.selected_columns(), Some("row"), ignore);
        page_sql(&select, &projection, page_size, page)
    }

    /// Fetch one page, rows deserialized from their JSON objects.
    pub async fn page<T: DeserializeOwned>(
        &self,
        conn: &impl GenericClient,
        page: u64,
        page_size: u64,
        ignore: &[&str],
    ) -> OrmResult<PageResult<T>> {
        let statement = self.page_sql(page, page_size, ignore)?;
        let row = statement.fetch_one(conn).await?;

        let total: i64 = row.try_get_column("total")?;
        let list: Option<serde_json::Value> = row.try_get_column("list")?;
        let list: Vec<T> = match list {
            Some(json) => serde_json::from_value(json)?,
            None => Vec::new(),
        };

        let mut result = PageResult {
            total: u64::try_from(total).unwrap_or_default(),
            total_page: 0,
            page: page.max(1),
            page_size,
            list,
        };
        result.total_page = result.calc_total_page();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamBag;

    fn select() -> Statement {
        Statement::new(
            Method::Select,
            "SELECT * FROM \"users\" WHERE (age=:age)".into(),
            None,
            ParamBag::new(),
            false,
        )
    }

    #[test]
    fn offset_follows_page_number() {
        let first = page_sql(&select(), "'uid',row.uid", 10, 1).unwrap();
        assert!(first.sql().contains("LIMIT 10 OFFSET 0)"));

        let third = page_sql(&select(), "'uid',row.uid", 10, 3).unwrap();
        assert!(third.sql().contains("LIMIT 10 OFFSET 20)"));

        let zero = page_sql(&select(), "'uid',row.uid", 10, 0).unwrap();
        assert!(zero.sql().contains("OFFSET 0)"));
    }

    #[test]
    fn rejects_page_size_below_one() {
        let err = page_sql(&select(), "", 0, 1).unwrap_err();
        assert!(matches!(err, OrmError::InvalidPageSize(0)));
    }

    #[test]
    fn template_shape() {
        let stmt = page_sql(&select(), "'uid',row.uid", 5, 2).unwrap();
        assert_eq!(
            stmt.sql(),
            "WITH t AS (SELECT * FROM \"users\" WHERE (age=:age)), \
             t1 AS (SELECT count(*) AS total FROM t), \
             t2 AS (SELECT jsonb_agg(jsonb_build_object('uid',row.uid)) list FROM (SELECT * FROM t LIMIT 5 OFFSET 5) row), \
             t3 AS (SELECT t2.*, t1.* FROM t2 CROSS JOIN t1) \
             SELECT * FROM t3"
        );
    }

    #[test]
    fn total_pages_round_up() {
        let page = |total| PageResult::<()> {
            total,
            page_size: 10,
            ..Default::default()
        };
        assert_eq!(page(25).calc_total_page(), 3);
        assert_eq!(page(20).calc_total_page(), 2);
        assert_eq!(page(0).calc_total_page(), 0);
    }

    #[test]
    fn object_keys_skip_ignored_fields() {
        let mut columns = ColumnMap::new();
        columns.insert("uid", "uid");
        columns.insert("userName", "user_name");
        columns.insert("secret", "secret");
        assert_eq!(
            jsonb_object_keys(&columns, Some("row"), &["secret"]),
            "'uid',row.uid,'userName',row.user_name"
        );
        assert_eq!(jsonb_object_keys(&columns, None, &["secret", "uid"]), "'userName',user_name");

        let mut quoted = ColumnMap::new();
        quoted.insert("o'key", "okey");
        assert_eq!(jsonb_object_keys(&quoted, None, &[]), "'o''key',okey");
    }
}
