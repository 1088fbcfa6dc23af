use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ForwardingAddress;

#[derive(Debug, Serialize, Deserialize)]
pub struct ForwardingAddressSchema {
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
    pub status: i32,
    pub status_name: String,
    pub signed_fwd_transaction: Option<String>,
    pub created: DateTime<Utc>,
    pub transmitted: Option<DateTime<Utc>>,
    pub is_confirmed_by_client: bool,
    pub confirm_callback_attempt: u32,
    pub callback_number_of_errors: u32,
}

impl From<ForwardingAddress> for ForwardingAddressSchema {
    fn from(record: ForwardingAddress) -> Self {
        Self {
            id: record.id,
            callback: record.callback,
            destination_address: record.destination_address,
            input_address: record.input_address,
            input_transaction_hash: record.input_transaction_hash,
            transaction_hash: record.transaction_hash,
            payee_addresses: record.payee_addresses,
            confirmations: record.confirmations,
            value: record.value,
            fwd_miners_fee: record.fwd_miners_fee,
            input_miners_fee: record.input_miners_fee,
            status: record.status as i32,
            status_name: record.status.as_str().to_string(),
            signed_fwd_transaction: record.signed_fwd_transaction,
            created: record.created,
            transmitted: record.transmitted,
            is_confirmed_by_client: record.is_confirmed_by_client,
            confirm_callback_attempt: record.confirm_callback_attempt,
            callback_number_of_errors: record.callback_number_of_errors,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnconfirmedListResponse {
    pub addresses: Vec<ForwardingAddressSchema>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackUrlResponse {
    pub id: Uuid,
    pub callback_url: String,
}
