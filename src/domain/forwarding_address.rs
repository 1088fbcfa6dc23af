//! Forwarding address domain entity.
//! Framework-agnostic representation of a generated receiving address and
//! its lifecycle. Timestamps are supplied by callers.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Lifecycle stage of a forwarding address. Stages only advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type)]
#[repr(i32)]
pub enum ForwardingStatus {
    /// Waiting for funds to arrive at the input address.
    Pending = 0,
    /// Deposit received and recorded; the forward may not be broadcast yet.
    Completed = 1,
    /// Forwarding transaction broadcast to the network. Terminal.
    Transmitted = 2,
}

impl ForwardingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Transmitted => "transmitted",
        }
    }
}

impl fmt::Display for ForwardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("status cannot move from {from} to {to}")]
    StatusNotAdvancing {
        from: ForwardingStatus,
        to: ForwardingStatus,
    },
    #[error("record is still pending, there is no delivery for the client to confirm")]
    NothingToConfirm,
}

/// Transaction details recorded when the deposit to the input address is
/// resolved and the forward is prepared.
#[derive(Debug, Clone)]
pub struct Completion {
    pub input_transaction_hash: String,
    pub transaction_hash: Option<String>,
    pub value: i64,
    pub fwd_miners_fee: i64,
    pub input_miners_fee: i64,
    pub signed_fwd_transaction: Option<String>,
    pub payee_addresses: Option<String>,
}

/// Domain entity representing one generated forwarding address.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ForwardingAddress {
    pub id: Uuid,
    pub callback: String,
    pub destination_address: String,
    pub input_address: String,
    pub input_transaction_hash: Option<String>,
    pub transaction_hash: Option<String>,
    pub payee_addresses: Option<String>,
    pub confirmations: u32,
    pub value: Option<i64>,
    pub fwd_miners_fee: Option<i64>,
    pub input_miners_fee: Option<i64>,
    pub status: ForwardingStatus,
    pub signed_fwd_transaction: Option<String>,
    pub created: DateTime<Utc>,
    pub transmitted: Option<DateTime<Utc>>,
    pub is_confirmed_by_client: bool,
    pub confirm_callback_attempt: u32,
    pub callback_number_of_errors: u32,
}

impl ForwardingAddress {
    pub fn new(
        destination_address: String,
        input_address: String,
        callback: String,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            callback,
            destination_address,
            input_address,
            input_transaction_hash: None,
            transaction_hash: None,
            payee_addresses: None,
            confirmations: 0,
            value: None,
            fwd_miners_fee: None,
            input_miners_fee: None,
            status: ForwardingStatus::Pending,
            signed_fwd_transaction: None,
            created,
            transmitted: None,
            is_confirmed_by_client: false,
            confirm_callback_attempt: 0,
            callback_number_of_errors: 0,
        }
    }

    /// Records the resolved deposit and advances the record to `Completed`.
    /// Legal only from `Pending`; recorded transaction details are never
    /// overwritten by a second completion report.
    pub fn mark_completed(&mut self, completion: Completion) -> Result<(), TransitionError> {
        if self.status != ForwardingStatus::Pending {
            return Err(TransitionError::StatusNotAdvancing {
                from: self.status,
                to: ForwardingStatus::Completed,
            });
        }

        self.input_transaction_hash = Some(completion.input_transaction_hash);
        if completion.transaction_hash.is_some() {
            self.transaction_hash = completion.transaction_hash;
        }
        self.value = Some(completion.value);
        self.fwd_miners_fee = Some(completion.fwd_miners_fee);
        self.input_miners_fee = Some(completion.input_miners_fee);
        self.signed_fwd_transaction = completion.signed_fwd_transaction;
        self.payee_addresses = completion.payee_addresses;
        self.status = ForwardingStatus::Completed;
        Ok(())
    }

    /// Marks the forward as broadcast. A missing hash leaves any previously
    /// recorded hash in place. Re-applying on an already transmitted record
    /// is a no-op, so retrying broadcast reporters stay safe.
    pub fn mark_transmitted(
        &mut self,
        transaction_hash: Option<String>,
        transmitted_at: DateTime<Utc>,
    ) {
        if self.status == ForwardingStatus::Transmitted {
            return;
        }
        if transaction_hash.is_some() {
            self.transaction_hash = transaction_hash;
        }
        self.transmitted = Some(transmitted_at);
        self.status = ForwardingStatus::Transmitted;
    }

    /// Records that the customer endpoint acknowledged the callback. There
    /// is nothing to acknowledge while the record is still pending.
    pub fn confirm_by_client(&mut self) -> Result<(), TransitionError> {
        if self.status == ForwardingStatus::Pending {
            return Err(TransitionError::NothingToConfirm);
        }
        self.is_confirmed_by_client = true;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.status >= ForwardingStatus::Completed
    }

    pub fn is_transmitted(&self) -> bool {
        self.status >= ForwardingStatus::Transmitted
    }

    /// Confirmation gate predicate: the record has progressed past pending
    /// but the customer endpoint has not acknowledged the callback yet.
    pub fn needs_client_callback(&self) -> bool {
        self.is_complete() && !self.is_confirmed_by_client
    }
}
