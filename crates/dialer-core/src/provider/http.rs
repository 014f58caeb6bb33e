//! HTTP call provider: `POST {base_url}/call` with a JSON body.
//!
//! Uses the curl crate (libcurl); transfers run on the blocking pool.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{CallProvider, CallRequest};
use crate::config::ProviderConfig;
use crate::error::DialerError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCallBody<'a> {
    assistant_id: &'a str,
    phone_number_id: &'a str,
    customer: Customer<'a>,
    assistant_overrides: AssistantOverrides<'a>,
}

#[derive(Debug, Serialize)]
struct Customer<'a> {
    number: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistantOverrides<'a> {
    variable_values: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CreateCallResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct HttpCallProvider {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpCallProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key,
            timeout,
        }
    }

    /// Build from config, reading the bearer token from `api_key_env` if set.
    pub fn from_config(cfg: &ProviderConfig) -> Self {
        let api_key = std::env::var(&cfg.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(env = %cfg.api_key_env, "provider API key not set");
        }
        Self::new(&cfg.base_url, api_key, Duration::from_secs(cfg.timeout_secs))
    }

    fn endpoint(&self) -> String {
        format!("{}/call", self.base_url)
    }
}

fn post_json(
    url: &str,
    api_key: Option<&str>,
    timeout: Duration,
    body: &[u8],
) -> anyhow::Result<(u32, Vec<u8>)> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid provider URL")?;
    easy.post(true)?;
    easy.post_fields_copy(body)?;
    easy.connect_timeout(Duration::from_secs(10))?;
    easy.timeout(timeout)?;

    let mut list = curl::easy::List::new();
    list.append("Content-Type: application/json")?;
    if let Some(key) = api_key {
        list.append(&format!("Authorization: Bearer {}", key.trim()))?;
    }
    easy.http_headers(list)?;

    let mut response = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            response.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform().context("create call request failed")?;
    }
    let code = easy.response_code().context("no response code")?;
    Ok((code, response))
}

#[async_trait]
impl CallProvider for HttpCallProvider {
    async fn create_call(&self, request: &CallRequest) -> Result<String, DialerError> {
        let body = CreateCallBody {
            assistant_id: &request.assistant_id,
            phone_number_id: &request.line_id,
            customer: Customer {
                number: &request.customer_number,
                name: &request.customer_name,
            },
            assistant_overrides: AssistantOverrides {
                variable_values: &request.variables,
            },
        };
        let body = serde_json::to_vec(&body)
            .map_err(|e| DialerError::Provider(format!("encode request: {e}")))?;

        let url = self.endpoint();
        let api_key = self.api_key.clone();
        let timeout = self.timeout;
        let (code, response) = tokio::task::spawn_blocking(move || {
            post_json(&url, api_key.as_deref(), timeout, &body)
        })
        .await
        .map_err(|e| DialerError::Provider(format!("dial task: {e}")))?
        .map_err(|e| DialerError::Provider(format!("{e:#}")))?;

        if !(200..300).contains(&code) {
            let text = String::from_utf8_lossy(&response);
            return Err(DialerError::Provider(format!(
                "HTTP {}: {}",
                code,
                text.chars().take(200).collect::<String>()
            )));
        }
        let parsed: CreateCallResponse = serde_json::from_slice(&response)
            .map_err(|e| DialerError::Provider(format!("decode response: {e}")))?;
        Ok(parsed.id)
    }
}
