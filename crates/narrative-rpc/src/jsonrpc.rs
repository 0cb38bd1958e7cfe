//! JSON-RPC 1.1 over HTTP
//!
//! Requests are `{"version": "1.1", "method": "Service.method", "params":
//! [arg], "id": "..."}`; answers carry either a `result` list or an `error`
//! object. Servers report errors with a 500 status and an error body, so
//! the body is decoded before the status is looked at.

use narrative_core::RemoteError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    version: &'static str,
    method: String,
    params: [&'a Value; 1],
    id: String,
}

impl<'a> RpcRequest<'a> {
    pub(crate) fn new(service: &str, method: &str, params: &'a Value) -> Self {
        Self {
            version: "1.1",
            method: format!("{service}.{method}"),
            params: [params],
            id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    /// Server-side trace
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// Turn a response body into the first result value, if any
pub(crate) fn decode_response(
    service: &str,
    method: &str,
    status: u16,
    body: &str,
) -> Result<Option<Value>, RemoteError> {
    let parsed: Result<RpcResponse, _> = serde_json::from_str(body);
    match parsed {
        Ok(RpcResponse { error: Some(err), .. }) => Err(RemoteError::Service {
            service: service.to_string(),
            method: method.to_string(),
            code: err.code,
            message: err
                .message
                .or(err.error)
                .unwrap_or_else(|| format!("HTTP {status}")),
        }),
        Ok(_) if !(200..300).contains(&status) => Err(RemoteError::Transport {
            service: service.to_string(),
            message: format!("HTTP {status}"),
        }),
        Ok(RpcResponse { result, .. }) => Ok(match result {
            Some(Value::Array(mut items)) if !items.is_empty() => Some(items.swap_remove(0)),
            Some(Value::Array(_) | Value::Null) | None => None,
            Some(other) => Some(other),
        }),
        Err(_) if !(200..300).contains(&status) => Err(RemoteError::Transport {
            service: service.to_string(),
            message: format!("HTTP {status}"),
        }),
        Err(e) => Err(RemoteError::Decode {
            service: service.to_string(),
            method: method.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Client for one JSON-RPC service endpoint
#[derive(Clone)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    service: &'static str,
    headers: HeaderMap,
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("service", &self.service)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    /// Client for `service` at `url`; `token` goes in the Authorization header
    ///
    /// # Errors
    /// `Transport` when the token is not a valid header value or the HTTP
    /// client cannot be built
    pub fn new(
        service: &'static str,
        url: impl Into<String>,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let transport = |message: String| RemoteError::Transport {
            service: service.to_string(),
            message,
        };
        let mut headers = HeaderMap::new();
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value =
                HeaderValue::from_str(token).map_err(|e| transport(format!("invalid auth header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| transport(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            service,
            headers,
        })
    }

    #[inline]
    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Call `method` and return its first result, if any
    ///
    /// # Errors
    /// `Transport` on network or HTTP failure, `Service` when the server
    /// returns an error object, `Decode` on an unreadable body
    #[tracing::instrument(name = "rpc_call", skip(self, params), fields(service = self.service))]
    pub async fn call_raw(&self, method: &str, params: &Value) -> Result<Option<Value>, RemoteError> {
        let request = RpcRequest::new(self.service, method, params);
        let transport = |e: reqwest::Error| RemoteError::Transport {
            service: self.service.to_string(),
            message: e.to_string(),
        };
        let response = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        tracing::trace!(status, bytes = body.len(), "rpc response");
        decode_response(self.service, method, status, &body)
    }

    /// Call `method` and decode its first result
    ///
    /// # Errors
    /// As [`call_raw`](Self::call_raw); `Decode` when there is no result or
    /// it does not have the expected shape
    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<R, RemoteError> {
        let value = self.call_raw(method, params).await?.ok_or_else(|| RemoteError::Decode {
            service: self.service.to_string(),
            method: method.to_string(),
            message: "empty result".to_string(),
        })?;
        serde_json::from_value(value).map_err(|e| RemoteError::Decode {
            service: self.service.to_string(),
            method: method.to_string(),
            message: e.to_string(),
        })
    }

    /// Call a method whose result is ignored
    ///
    /// # Errors
    /// As [`call_raw`](Self::call_raw)
    pub async fn call_unit(&self, method: &str, params: &Value) -> Result<(), RemoteError> {
        self.call_raw(method, params).await.map(|_| ())
    }
}

/// Boolean as the 0/1 integer the services expect
#[inline]
pub(crate) fn int_flag(value: bool) -> u8 {
    u8::from(value)
}
