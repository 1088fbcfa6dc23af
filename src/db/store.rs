//! Persistence for forwarding addresses.
//!
//! The store owns no lifecycle logic. Transitions happen on the domain
//! entity; `update_transition` persists the result guarded by the status
//! the caller last observed, so concurrent writers lose cleanly instead of
//! clobbering each other. Delivery bookkeeping moves through single-statement
//! increments and never touches the lifecycle fields.

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::{ForwardingAddress, ForwardingStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("input address {0} is already registered")]
    DuplicateInputAddress(String),
    #[error("forwarding address {0} not found")]
    NotFound(Uuid),
    #[error("forwarding address {id} was updated concurrently (expected status {expected})")]
    Conflict { id: Uuid, expected: ForwardingStatus },
}

#[derive(Clone)]
pub struct ForwardingAddressStore {
    pool: SqlitePool,
}

impl ForwardingAddressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts a fresh pending record for the given addresses and callback.
    pub async fn create(
        &self,
        destination_address: &str,
        input_address: &str,
        callback: &str,
        created: DateTime<Utc>,
    ) -> Result<ForwardingAddress, StoreError> {
        let record = ForwardingAddress::new(
            destination_address.to_string(),
            input_address.to_string(),
            callback.to_string(),
            created,
        );

        let inserted = sqlx::query_as::<_, ForwardingAddress>(
            "INSERT INTO forwarding_addresses \
             (id, callback, destination_address, input_address, confirmations, status, \
              created, is_confirmed_by_client, confirm_callback_attempt, callback_number_of_errors) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             RETURNING *",
        )
        .bind(record.id)
        .bind(&record.callback)
        .bind(&record.destination_address)
        .bind(&record.input_address)
        .bind(record.confirmations)
        .bind(record.status)
        .bind(record.created)
        .bind(record.is_confirmed_by_client)
        .bind(record.confirm_callback_attempt)
        .bind(record.callback_number_of_errors)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::DuplicateInputAddress(input_address.to_string());
                }
            }
            StoreError::Database(e)
        })?;

        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ForwardingAddress>, StoreError> {
        let row = sqlx::query_as::<_, ForwardingAddress>(
            "SELECT * FROM forwarding_addresses WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_by_input_address(
        &self,
        input_address: &str,
    ) -> Result<Option<ForwardingAddress>, StoreError> {
        let row = sqlx::query_as::<_, ForwardingAddress>(
            "SELECT * FROM forwarding_addresses WHERE input_address = ?1",
        )
        .bind(input_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Records that passed the confirmation gate: progressed past pending,
    /// callback not yet acknowledged by the client.
    pub fn unconfirmed_by_client(&self) -> BoxStream<'_, Result<ForwardingAddress, StoreError>> {
        sqlx::query_as::<_, ForwardingAddress>(
            "SELECT * FROM forwarding_addresses \
             WHERE status > ?1 AND is_confirmed_by_client = FALSE \
             ORDER BY created",
        )
        .bind(ForwardingStatus::Pending)
        .fetch(&self.pool)
        .map(|row| row.map_err(StoreError::from))
        .boxed()
    }

    /// Persists the lifecycle-owned fields of `record`, guarded by the
    /// status the caller observed before transitioning. Zero rows affected
    /// means either the row vanished or another writer advanced it first.
    /// `confirmations` moves only through [`Self::set_confirmations`] and is
    /// never written here, so a tick landing mid-transition is not rewound.
    pub async fn update_transition(
        &self,
        record: &ForwardingAddress,
        expected: ForwardingStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE forwarding_addresses SET \
             input_transaction_hash = ?1, transaction_hash = ?2, payee_addresses = ?3, \
             value = ?4, fwd_miners_fee = ?5, input_miners_fee = ?6, \
             status = ?7, signed_fwd_transaction = ?8, transmitted = ?9 \
             WHERE id = ?10 AND status = ?11",
        )
        .bind(&record.input_transaction_hash)
        .bind(&record.transaction_hash)
        .bind(&record.payee_addresses)
        .bind(record.value)
        .bind(record.fwd_miners_fee)
        .bind(record.input_miners_fee)
        .bind(record.status)
        .bind(&record.signed_fwd_transaction)
        .bind(record.transmitted)
        .bind(record.id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(record.id).await? {
                Some(_) => Err(StoreError::Conflict {
                    id: record.id,
                    expected,
                }),
                None => Err(StoreError::NotFound(record.id)),
            };
        }

        Ok(())
    }

    pub async fn set_confirmations(&self, id: Uuid, confirmations: u32) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE forwarding_addresses SET confirmations = ?1 WHERE id = ?2")
                .bind(confirmations)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    /// Marks the callback acknowledged and counts the attempt. Guarded so a
    /// still-pending record can never be marked client-confirmed.
    pub async fn record_delivery_success(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE forwarding_addresses SET \
             is_confirmed_by_client = TRUE, \
             confirm_callback_attempt = confirm_callback_attempt + 1 \
             WHERE id = ?1 AND status > ?2",
        )
        .bind(id)
        .bind(ForwardingStatus::Pending)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(_) => Err(StoreError::Conflict {
                    id,
                    expected: ForwardingStatus::Completed,
                }),
                None => Err(StoreError::NotFound(id)),
            };
        }

        Ok(())
    }

    pub async fn record_delivery_failure(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE forwarding_addresses SET \
             confirm_callback_attempt = confirm_callback_attempt + 1, \
             callback_number_of_errors = callback_number_of_errors + 1 \
             WHERE id = ?1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }
}
