//! Spark PostgREST client for Rust
//!
//! Table access for the Spark backend: filtered and ordered selects, inserts,
//! partial updates and deletes, all through the PostgREST HTTP interface.

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use url::Url;

/// PostgREST APIエラーの詳細情報
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostgrestApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// エラー型
#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: PostgrestApiErrorDetails,
        status: reqwest::StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError {
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

/// ソート方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

async fn error_from_response(response: Response) -> PostgrestError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());

    match serde_json::from_str::<PostgrestApiErrorDetails>(&error_text) {
        Ok(details) => PostgrestError::ApiError { details, status },
        Err(_) => PostgrestError::UnparsedApiError {
            message: error_text,
            status,
        },
    }
}

/// Decode a `return=representation` body. Empty bodies decode to no rows.
async fn rows_from_response<R: DeserializeOwned>(
    response: Response,
) -> Result<Vec<R>, PostgrestError> {
    let body_text = response.text().await.map_err(|e| {
        PostgrestError::DeserializationError(format!("Failed to read response body: {}", e))
    })?;

    if body_text.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str::<Vec<R>>(&body_text)
        .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
}

/// PostgREST クライアント
///
/// One client addresses one table; filters accumulate builder-style and apply
/// to whichever operation runs last.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    base_url: String,
    api_key: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    filters: BTreeMap<String, String>,
    query_params: BTreeMap<String, String>,
}

impl PostgrestClient {
    /// 新しい PostgREST クライアントを作成
    pub fn new(base_url: &str, api_key: &str, table: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
            http_client,
            headers: HeaderMap::new(),
            filters: BTreeMap::new(),
            query_params: BTreeMap::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// ヘッダーを追加
    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, PostgrestError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;

        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// 認証トークンを設定
    pub fn with_auth(self, token: &str) -> Result<Self, PostgrestError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    /// Target a schema other than the default `public`.
    pub fn schema(self, schema_name: &str) -> Result<Self, PostgrestError> {
        self.with_header("Accept-Profile", schema_name)?
            .with_header("Content-Profile", schema_name)
    }

    /// 取得するカラムを指定
    pub fn select(mut self, columns: &str) -> Self {
        self.query_params
            .insert("select".to_string(), columns.to_string());
        self
    }

    /// 等価フィルター
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters
            .insert(column.to_string(), format!("eq.{}", value));
        self
    }

    /// ソート順を指定
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.query_params
            .insert("order".to_string(), format!("{}.{}", column, order.as_str()));
        self
    }

    /// 取得件数を制限
    pub fn limit(mut self, count: u32) -> Self {
        self.query_params
            .insert("limit".to_string(), count.to_string());
        self
    }

    fn build_url(&self) -> Result<String, PostgrestError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in self.query_params.iter().chain(self.filters.iter()) {
                pairs.append_pair(key, value);
            }
        }
        // query_pairs_mut leaves an empty `?` behind when nothing was appended
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url.to_string())
    }

    fn request(&self, method: Method) -> Result<RequestBuilder, PostgrestError> {
        let url = self.build_url()?;
        debug!("{} {}", method, url);
        Ok(self
            .http_client
            .request(method, url)
            .header("apikey", &self.api_key)
            .headers(self.headers.clone()))
    }

    fn require_filter(&self, operation: &str) -> Result<(), PostgrestError> {
        if self.filters.is_empty() {
            return Err(PostgrestError::InvalidParameters(format!(
                "{} on '{}' requires at least one filter",
                operation, self.table
            )));
        }
        Ok(())
    }

    /// データを取得
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, PostgrestError> {
        let response = self.request(Method::GET)?.send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }

    /// At most one row; `None` when nothing matched.
    pub async fn maybe_single<T: DeserializeOwned>(&self) -> Result<Option<T>, PostgrestError> {
        let rows = self.clone().limit(1).execute::<T>().await?;
        Ok(rows.into_iter().next())
    }

    /// データを挿入し、挿入された行を返す
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        values: T,
    ) -> Result<Vec<R>, PostgrestError> {
        let response = self
            .request(Method::POST)?
            .header("Prefer", "return=representation")
            .json(&values)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        rows_from_response(response).await
    }

    /// Insert without asking for the rows back.
    pub async fn insert_minimal<T: Serialize>(&self, values: T) -> Result<(), PostgrestError> {
        let response = self
            .request(Method::POST)?
            .header("Prefer", "return=minimal")
            .json(&values)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }

    /// データを更新し、更新された行を返す
    pub async fn update<T: Serialize, R: DeserializeOwned>(
        &self,
        values: T,
    ) -> Result<Vec<R>, PostgrestError> {
        self.require_filter("update")?;

        let response = self
            .request(Method::PATCH)?
            .header("Prefer", "return=representation")
            .json(&values)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        rows_from_response(response).await
    }

    /// データを削除
    pub async fn delete(&self) -> Result<(), PostgrestError> {
        self.require_filter("delete")?;

        let response = self
            .request(Method::DELETE)?
            .header("Prefer", "return=minimal")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }
}
