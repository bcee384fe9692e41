//! HTTP JSON adapter for the grid's REST surface.
//!
//! Record payloads are opaque bytes, so they travel base64-encoded in
//! the JSON body. All calls are blocking: within a run the next batch
//! is never assembled until the previous write has returned, and each
//! run owns a whole worker thread anyway.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::store::{StoreClient, StoreError, TypeDescriptor};
use crate::wire::Record;

/// A connected handle to one grid endpoint.
pub struct HttpStore {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct WireRecord<'a> {
    type_name: &'a str,
    payload: String,
}

impl HttpStore {
    /// Connect to the grid at `base_url` (e.g. `http://grid:9600`).
    pub fn connect(base_url: &str) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn type_url(&self, type_name: &str) -> String {
        format!("{}/v1/types/{type_name}", self.base_url)
    }

    fn rejected(status: StatusCode, body: String) -> StoreError {
        // The grid wraps errors as {"message": "..."}; fall back to
        // the raw body for anything else.
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        StoreError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

impl StoreClient for HttpStore {
    fn type_descriptor(&self, type_name: &str) -> Result<Option<TypeDescriptor>, StoreError> {
        let response = self.client.get(self.type_url(type_name)).send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json()?)),
            status => Err(Self::rejected(status, response.text().unwrap_or_default())),
        }
    }

    fn register_type_descriptor(&self, descriptor: TypeDescriptor) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.type_url(&descriptor.type_name))
            .json(&descriptor)
            .send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::rejected(status, response.text().unwrap_or_default()))
        }
    }

    fn bulk_write(&self, records: &[Record]) -> Result<(), StoreError> {
        // All records in a batch share the run's type; the grid routes
        // on the per-record type name regardless.
        let Some(first) = records.first() else {
            return Ok(());
        };
        let body: Vec<WireRecord<'_>> = records
            .iter()
            .map(|r| WireRecord {
                type_name: &r.type_name,
                payload: BASE64.encode(&r.payload),
            })
            .collect();
        let url = format!("{}/entries", self.type_url(&first.type_name));
        let response = self.client.post(url).json(&body).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::rejected(status, response.text().unwrap_or_default()))
        }
    }
}
