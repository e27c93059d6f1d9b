//! Terminal calls: build the statement and run it on a client.
//!
//! Every call compiles a fresh statement, so a stored builder error surfaces
//! here before any I/O.

use super::Builder;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::row::{FromRow, RowExt};
use serde::de::DeserializeOwned;
use tokio_postgres::Row;

impl Builder {
    /// Execute and return the affected row count.
    pub async fn execute(&self, conn: &impl GenericClient) -> OrmResult<u64> {
        self.build()?.execute(conn).await
    }

    pub async fn fetch_all(&self, conn: &impl GenericClient) -> OrmResult<Vec<Row>> {
        self.build()?.fetch_all(conn).await
    }

    pub async fn fetch_one(&self, conn: &impl GenericClient) -> OrmResult<Row> {
        self.build()?.fetch_one(conn).await
    }

    pub async fn fetch_opt(&self, conn: &impl GenericClient) -> OrmResult<Option<Row>> {
        self.build()?.fetch_opt(conn).await
    }

    pub async fn fetch_all_as<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<Vec<T>> {
        self.build()?.fetch_all_as(conn).await
    }

    pub async fn fetch_one_as<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<T> {
        self.build()?.fetch_one_as(conn).await
    }

    pub async fn fetch_opt_as<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<Option<T>> {
        self.build()?.fetch_opt_as(conn).await
    }

    /// `count(column)` over the rows matching the conditions.
    pub async fn count(&self, conn: &impl GenericClient, column: &str) -> OrmResult<i64> {
        let row = self.count_sql(column)?.fetch_one(conn).await?;
        row.try_get(0)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }

    /// All matching rows as one JSON array, deserialized into `T`.
    pub async fn jsonb_list<T: DeserializeOwned>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<Vec<T>> {
        let row = self.jsonb_list_sql()?.fetch_one(conn).await?;
        let json: Option<serde_json::Value> = row.try_get_column("jsonb_agg")?;
        match json {
            Some(json) => Ok(serde_json::from_value(json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Matching rows folded into one JSON object by `jsonb_object_agg(keys)`.
    ///
    /// `None` when no row matched.
    pub async fn jsonb_map<T: DeserializeOwned>(
        &self,
        conn: &impl GenericClient,
        keys: &[&str],
    ) -> OrmResult<Option<T>> {
        let row = self.jsonb_map_sql(keys)?.fetch_one(conn).await?;
        let json: Option<serde_json::Value> = row.try_get_column("jsonb_object_agg")?;
        json.map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }
}
