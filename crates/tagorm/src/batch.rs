//! Transaction helpers.
//!
//! Compiled statements accept any [`GenericClient`](crate::GenericClient), a
//! transaction included. [`transaction!`] handles commit/rollback around a
//! block, and [`execute_batch`] runs independently built statements in one
//! transaction.
//!
//! # Example
//!
//! ```ignore
//! use tagorm::{OrmResult, insert, update};
//!
//! # async fn demo(client: &mut tokio_postgres::Client, user: User, audit: Audit) -> OrmResult<()> {
//! tagorm::transaction!(client, tx, {
//!     insert(&audit).execute(&tx).await?;
//!     update(&user).where_pk().execute(&tx).await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

use crate::error::{OrmError, OrmResult};
use crate::statement::Statement;

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `tagorm::OrmResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::OrmError::from_db_error)?;

        let __tagorm_tx_body_result = async { $body }.await;
        match __tagorm_tx_body_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::OrmError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

/// Execute `statements` in order inside one transaction.
///
/// Returns the total affected row count. Any failure, a mutation affecting
/// zero rows included, rolls the whole batch back.
pub async fn execute_batch(
    client: &mut tokio_postgres::Client,
    statements: &[Statement],
) -> OrmResult<u64> {
    transaction!(client, tx, {
        let mut affected = 0;
        for statement in statements {
            affected += statement.execute(&tx).await?;
        }
        tracing::debug!(
            target: "tagorm.sql",
            statements = statements.len(),
            affected,
            "batch committed"
        );
        Ok::<u64, OrmError>(affected)
    })
}
