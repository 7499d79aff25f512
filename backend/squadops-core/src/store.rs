// src/store.rs

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// PostgREST-style resource paths on the hosted store.
const REST_PATH: &str = "rest/v1/";
const RPC_PATH: &str = "rest/v1/rpc/";

// Table names as provisioned on the hosted store.
pub const TABLE_MILITARY: &str = "military";
pub const TABLE_ATTENDANCE: &str = "attendance_records";
pub const TABLE_JUSTIFICATIONS: &str = "justifications";
pub const TABLE_FLIGHTS: &str = "flights";
pub const TABLE_EVENTS: &str = "events";
pub const TABLE_KEYS: &str = "key_logs";
pub const TABLE_NOTES: &str = "notes";
pub const TABLE_PERMANENCE: &str = "permanence";
pub const TABLE_CLEANING: &str = "cleaning_assignments";
pub const TABLE_TI_TICKETS: &str = "ti_tickets";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Row store returned an error: {status} - {message:?}")]
    ApiError {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("URL parsing failed: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Expected row missing from store response")]
    MissingRow,
    #[error("Row store configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Thin client for the hosted row store. One resource path per table, query
/// string filters (`column=eq.value`), JSON bodies, ids and `created_at`
/// assigned by the store.
#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    base: Url,
    config: Arc<StoreConfig>,
}

impl StoreClient {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        if config.base_url.trim().is_empty() {
            return Err(StoreError::Config("store base URL is empty".to_string()));
        }
        // Url::join treats the last path segment as a file unless the base
        // ends with a slash.
        let normalized = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let base = Url::parse(&normalized)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base,
            config: Arc::new(config),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        Ok(self.base.join(REST_PATH)?.join(table)?)
    }

    fn rpc_url(&self, function: &str) -> Result<Url, StoreError> {
        Ok(self.base.join(RPC_PATH)?.join(function)?)
    }

    fn build_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.config.api_key.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = request_builder.send().await?;
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str::<T>(&body).map_err(StoreError::from)
        } else {
            let error_text = response.text().await.ok();
            error!(
                "Row store request failed. Status: {}, Body: {:?}",
                status, error_text
            );
            Err(StoreError::ApiError {
                status,
                message: error_text,
            })
        }
    }

    async fn send_expect_ok(&self, request_builder: RequestBuilder) -> Result<(), StoreError> {
        let response = request_builder.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response.text().await.ok();
            error!(
                "Row store request failed. Status: {}, Body: {:?}",
                status, error_text
            );
            Err(StoreError::ApiError {
                status,
                message: error_text,
            })
        }
    }

    /// Fetches rows from `table`, selecting all columns plus any caller
    /// filters (`("date", "eq.2024-01-10")` style pairs).
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let mut url = self.table_url(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        debug!("Selecting rows from {}", table);
        let request = self.build_request(Method::GET, url);
        self.send_and_deserialize(request).await
    }

    /// Inserts one row and returns the stored representation (id and
    /// `created_at` filled in by the store).
    pub async fn insert<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let url = self.table_url(table)?;
        debug!("Inserting row into {}", table);
        let request = self
            .build_request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(body);
        let mut rows: Vec<T> = self.send_and_deserialize(request).await?;
        if rows.is_empty() {
            return Err(StoreError::MissingRow);
        }
        Ok(rows.remove(0))
    }

    /// Partial update of the row with the given id.
    pub async fn update<B: Serialize>(
        &self,
        table: &str,
        id: &str,
        body: &B,
    ) -> Result<(), StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", id));
        debug!("Updating row {} in {}", id, table);
        let request = self.build_request(Method::PATCH, url).json(body);
        self.send_expect_ok(request).await
    }

    /// Deletes the row with the given id. Deletion never cascades; history
    /// tables referencing the id keep their rows.
    pub async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", id));
        debug!("Deleting row {} from {}", id, table);
        let request = self.build_request(Method::DELETE, url);
        self.send_expect_ok(request).await
    }

    /// Invokes a server-side procedure. Used where a multi-record invariant
    /// needs a single transaction on the store side.
    pub async fn rpc<B: Serialize>(&self, function: &str, body: &B) -> Result<(), StoreError> {
        let url = self.rpc_url(function)?;
        debug!("Calling store procedure {}", function);
        let request = self.build_request(Method::POST, url).json(body);
        self.send_expect_ok(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> StoreClient {
        StoreClient::new(StoreConfig {
            base_url: base.to_string(),
            api_key: "test_key".to_string(),
        })
        .expect("client should build")
    }

    #[test]
    fn table_urls_join_under_the_rest_path() {
        let client = client("https://store.example.com");
        let url = client.table_url(TABLE_MILITARY).unwrap();
        assert_eq!(url.as_str(), "https://store.example.com/rest/v1/military");
    }

    #[test]
    fn trailing_slash_on_base_url_is_tolerated() {
        let client = client("https://store.example.com/");
        let url = client.table_url(TABLE_FLIGHTS).unwrap();
        assert_eq!(url.as_str(), "https://store.example.com/rest/v1/flights");
    }

    #[test]
    fn rpc_urls_join_under_the_rpc_path() {
        let client = client("https://store.example.com");
        let url = client.rpc_url("swap_seniority").unwrap();
        assert_eq!(
            url.as_str(),
            "https://store.example.com/rest/v1/rpc/swap_seniority"
        );
    }

    #[test]
    fn empty_base_url_is_a_config_error() {
        let result = StoreClient::new(StoreConfig {
            base_url: "  ".to_string(),
            api_key: "k".to_string(),
        });
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
