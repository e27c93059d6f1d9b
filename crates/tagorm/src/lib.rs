//! # tagorm
//!
//! A tag-driven dynamic SQL statement compiler for PostgreSQL.
//!
//! ## Features
//!
//! - **Records, not strings**: a struct's field tags (`db = "user_name,pk"`)
//!   decide columns, primary key and parameter names
//! - **Composable conditions**: descriptors are deduplicated by content and
//!   compiled into one WHERE clause
//! - **Two bind modes**: `:name` parameters bound by the driver, or inline
//!   literals
//! - **Safe defaults**: UPDATE/DELETE require WHERE, mutations affecting no
//!   rows are errors
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## Example
//!
//! ```ignore
//! use tagorm::{Cond, Record, select, update};
//!
//! #[derive(Record)]
//! #[orm(table = "users")]
//! struct User {
//!     #[tag(json = "uid", db = "uid,pk")]
//!     uid: String,
//!     #[tag(json = "userName", db = "user_name")]
//!     name: String,
//!     #[tag(json = "age", db = "age")]
//!     age: i64,
//! }
//!
//! // SELECT * FROM "users" WHERE (user_name=:userName) AND age>=:age_gte ORDER BY age DESC
//! let rows = select(&user)
//!     .filter(Cond::and(["userName"]))
//!     .filter(Cond::gte_val("age", 18))
//!     .desc(["age"])
//!     .fetch_all(&client)
//!     .await?;
//!
//! // UPDATE "users" SET user_name=:userName, age=:age WHERE (uid=:uid)
//! update(&user).where_pk().execute(&client).await?;
//! ```

// The derive macros refer to `::tagorm` paths, also from inside this crate's tests.
extern crate self as tagorm;

pub mod batch;
pub mod builder;
pub mod client;
pub mod compile;
pub mod condition;
pub mod config;
pub mod error;
pub mod named;
pub mod page;
pub mod param;
pub mod record;
pub mod resolve;
pub mod row;
pub mod statement;
pub mod trace;
pub mod value;

pub use batch::execute_batch;
pub use builder::Builder;
pub use client::GenericClient;
pub use compile::{BindMode, Compiled, compile};
pub use condition::{CompareOp, Cond, CondSet, InLiteral, Logic, literal_list};
pub use config::{Driver, OrmConfig};
pub use error::{OrmError, OrmResult};
pub use page::{PageResult, jsonb_object_keys, page_sql};
pub use param::ParamBag;
pub use record::{Field, FieldValue, Record, Table, Tags};
pub use resolve::{ColumnMap, Resolver};
pub use row::{FromRow, RowExt};
pub use statement::{Method, Statement, WithClause};
pub use trace::SqlLog;
pub use value::{ToValue, Value};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use tagorm_derive::{FromRow, Record};

// Generated `FromRow` impls name the row type through this path.
pub use tokio_postgres;

use std::sync::{Arc, LazyLock};

/// Entry point carrying one shared [`OrmConfig`].
///
/// Cloning is cheap; every builder holds the same configuration.
#[derive(Debug, Clone, Default)]
pub struct Orm {
    config: Arc<OrmConfig>,
}

impl Orm {
    pub fn new(config: OrmConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    fn builder<T: Table + ?Sized>(&self, method: Method, record: &T) -> Builder {
        Builder::new(self.config.clone(), method, record.table_name(), &record)
    }

    pub fn select<T: Table + ?Sized>(&self, record: &T) -> Builder {
        self.builder(Method::Select, record)
    }

    pub fn insert<T: Table + ?Sized>(&self, record: &T) -> Builder {
        self.builder(Method::Insert, record)
    }

    pub fn update<T: Table + ?Sized>(&self, record: &T) -> Builder {
        self.builder(Method::Update, record)
    }

    pub fn delete<T: Table + ?Sized>(&self, record: &T) -> Builder {
        self.builder(Method::Delete, record)
    }

    /// Caller-written SQL without parameters.
    pub fn raw(&self, sql: &str) -> Builder {
        Builder::raw(self.config.clone(), sql, &())
    }

    /// Caller-written SQL whose `:name` markers bind to the fields of `params`.
    pub fn raw_named(&self, sql: &str, params: &dyn Record) -> Builder {
        Builder::raw(self.config.clone(), sql, params)
    }
}

static DEFAULT_ORM: LazyLock<Orm> = LazyLock::new(Orm::default);

/// SELECT builder with the default configuration.
pub fn select<T: Table + ?Sized>(record: &T) -> Builder {
    DEFAULT_ORM.select(record)
}

/// INSERT builder with the default configuration.
pub fn insert<T: Table + ?Sized>(record: &T) -> Builder {
    DEFAULT_ORM.insert(record)
}

/// UPDATE builder with the default configuration.
pub fn update<T: Table + ?Sized>(record: &T) -> Builder {
    DEFAULT_ORM.update(record)
}

/// DELETE builder with the default configuration.
pub fn delete<T: Table + ?Sized>(record: &T) -> Builder {
    DEFAULT_ORM.delete(record)
}
