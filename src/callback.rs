//! Callback notification URL construction.
//!
//! The customer registers an arbitrary callback endpoint, possibly already
//! carrying its own query string. Notification appends the standard
//! parameter set after whatever is there; nothing is deduplicated, so a
//! customer parameter that collides with a standard name appears twice.

use url::form_urlencoded;
use url::Url;

use crate::domain::ForwardingAddress;

/// The stored callback endpoint could not be parsed as an absolute URL.
#[derive(Debug, thiserror::Error)]
#[error("invalid callback URL {url:?}: {source}")]
pub struct InvalidCallbackUrl {
    pub url: String,
    #[source]
    pub source: url::ParseError,
}

/// Builds the notification URL for a record from its current state.
///
/// The standard parameters are appended in a fixed order; unset fees encode
/// as `0` and other unset fields as empty strings. Scheme, authority, path
/// and fragment of the stored endpoint are preserved.
pub fn build_callback_url(record: &ForwardingAddress) -> Result<Url, InvalidCallbackUrl> {
    let mut url = Url::parse(&record.callback).map_err(|source| InvalidCallbackUrl {
        url: record.callback.clone(),
        source,
    })?;

    let fwd_fee = record.fwd_miners_fee.unwrap_or(0).to_string();
    let input_fee = record.input_miners_fee.unwrap_or(0).to_string();
    let value = record.value.map(|v| v.to_string()).unwrap_or_default();
    let confirmations = record.confirmations.to_string();

    let mut params = form_urlencoded::Serializer::new(String::new());
    params
        .append_pair("fwd_fee", &fwd_fee)
        .append_pair("input_fee", &input_fee)
        .append_pair("value", &value)
        .append_pair("input_address", &record.input_address)
        .append_pair("confirmations", &confirmations)
        .append_pair(
            "transaction_hash",
            record.transaction_hash.as_deref().unwrap_or(""),
        )
        .append_pair(
            "input_transaction_hash",
            record.input_transaction_hash.as_deref().unwrap_or(""),
        )
        .append_pair("destination_address", &record.destination_address)
        .append_pair(
            "payee_addresses",
            record.payee_addresses.as_deref().unwrap_or(""),
        );
    let encoded = params.finish();

    // Existing query stays verbatim and first.
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, encoded),
        _ => encoded,
    };
    url.set_query(Some(&query));

    Ok(url)
}
