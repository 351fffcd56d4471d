/// Load Module
///
/// Handles storing transformed delegations into PostgreSQL.
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Baker, CreateDelegation, NewDelegation};

/// Upsert a baker
///
/// On conflict only `last_seen` moves, and never backwards, so `first_seen`
/// keeps the timestamp of the first delegation that created the row.
pub async fn upsert_baker(tx: &mut Transaction<'_, Postgres>, baker: &Baker) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bakers (address, first_seen, last_seen)
        VALUES ($1, $2, $3)
        ON CONFLICT (address)
        DO UPDATE SET
            last_seen = GREATEST(bakers.last_seen, EXCLUDED.last_seen)
        "#,
    )
    .bind(&baker.address)
    .bind(baker.first_seen)
    .bind(baker.last_seen)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Insert a delegation
///
/// An operation hash that is already stored is left untouched. Returns whether a
/// row was written.
pub async fn insert_delegation(tx: &mut Transaction<'_, Postgres>, delegation: &NewDelegation) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO delegations (
            delegator,
            baker_id,
            amount,
            timestamp,
            level,
            operation_hash,
            is_new_delegation,
            previous_baker,
            indexed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (operation_hash) DO NOTHING
        "#,
    )
    .bind(&delegation.delegator)
    .bind(&delegation.baker_id)
    .bind(delegation.amount)
    .bind(delegation.timestamp)
    .bind(delegation.level)
    .bind(&delegation.operation_hash)
    .bind(delegation.is_new_delegation)
    .bind(&delegation.previous_baker)
    .bind(delegation.indexed_at)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Batch insert bakers and delegations within a database transaction
///
/// Pairs are written in input order, baker first, so a delegation always finds
/// its baker row. Either the whole batch is committed or none of it is, which
/// keeps the stored maximum level a safe resumption point.
///
/// Returns the number of delegations actually inserted.
pub async fn batch_insert_delegations(pool: &PgPool, batch: &[CreateDelegation]) -> sqlx::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for pair in batch {
        upsert_baker(&mut tx, &pair.baker).await?;

        if insert_delegation(&mut tx, &pair.delegation).await? {
            inserted += 1;
        } else {
            tracing::debug!(hash = %pair.delegation.operation_hash, "Delegation already stored");
        }
    }

    tx.commit().await?;

    tracing::info!("Batch inserted {} of {} delegations", inserted, batch.len());
    Ok(inserted)
}
