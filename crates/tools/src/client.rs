//! Typed HTTP client for the catalog API.

use reqwest::{Method, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockroom_infra::{LowStockView, MovementView, ProductView};

use crate::config::ToolsConfig;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The API could not be reached (connect, timeout, bad base URL).
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The API answered 2xx with a body that does not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Text placed in a tool envelope's `error` field.
    pub fn envelope_message(&self) -> String {
        match self {
            ClientError::Transport(msg) => format!("TransportError: {msg}"),
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Decode(_) => self.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductArgs {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sku: String,
    pub price: Decimal,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub reorder_level: i64,
}

/// `movement_type` is forwarded as given (name or integer code); the API validates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockArgs {
    pub movement_type: JsonValue,
    pub quantity: i64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub product: ProductView,
    pub movement: MovementView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ToolsConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
        })
    }

    pub async fn list_products(&self) -> Result<Vec<ProductView>, ClientError> {
        self.send(Method::GET, &["products"], None).await
    }

    pub async fn get_product(&self, id: &str) -> Result<ProductView, ClientError> {
        self.send(Method::GET, &["products", id], None).await
    }

    pub async fn list_low_stock(&self) -> Result<Vec<LowStockView>, ClientError> {
        self.send(Method::GET, &["products", "low-stock"], None).await
    }

    pub async fn create_product(&self, args: &CreateProductArgs) -> Result<ProductView, ClientError> {
        let body = encode(args)?;
        self.send(Method::POST, &["products"], Some(body)).await
    }

    pub async fn update_stock(&self, id: &str, args: &UpdateStockArgs) -> Result<StockUpdate, ClientError> {
        let body = encode(args)?;
        self.send(Method::PUT, &["products", id, "stock"], Some(body)).await
    }

    pub async fn get_stock_movements(&self, id: &str) -> Result<Vec<MovementView>, ClientError> {
        self.send(Method::GET, &["products", id, "movements"], None).await
    }

    pub async fn check_health(&self) -> Result<HealthStatus, ClientError> {
        self.send(Method::GET, &["health"], None).await
    }

    /// Segments are percent-encoded, so ids cannot escape their path position.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Transport(format!("invalid base URL '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("base URL '{}' cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<JsonValue>,
    ) -> Result<T, ClientError> {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "calling catalog API");

        let mut request = self.http.request(method, url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !status.is_success() {
            let parsed: Option<ApiErrorBody> = serde_json::from_slice(&bytes).ok();
            let (code, message) = match parsed {
                Some(b) => (Some(b.error), b.message),
                None => (None, String::from_utf8_lossy(&bytes).into_owned()),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn encode(value: &impl Serialize) -> Result<JsonValue, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}
