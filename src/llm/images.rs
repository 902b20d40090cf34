//! HTTP 图像客户端（OpenAI Images 兼容的 JSON 接口）
//!
//! create → POST {base}/images/generations；edit → POST {base}/images/edits（上一张图以 data URL 传入）。
//! 返回 b64_json 时转成 `data:image/png;base64,...`，否则使用返回的 url。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::llm::{ImageClient, LlmError};

pub const DEFAULT_IMAGE_BASE_URL: &str = "https://api.openai.com/v1";

pub struct HttpImageClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

impl HttpImageClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_IMAGE_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            api_key: api_key
                .map(String::from)
                .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<Option<String>, LlmError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::timeout(e.to_string())
            } else {
                LlmError::request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::malformed(e.to_string()))?;

        Ok(parsed.data.into_iter().find_map(|d| {
            d.b64_json
                .map(|b64| format!("data:image/png;base64,{b64}"))
                .or(d.url)
        }))
    }
}

#[async_trait]
impl ImageClient for HttpImageClient {
    async fn create(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": "1536x1024",
        });
        self.post("images/generations", body).await
    }

    async fn edit(&self, base_image: &str, prompt: &str) -> Result<Option<String>, LlmError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "images": [{ "image_url": base_image }],
            "size": "1536x1024",
        });
        self.post("images/edits", body).await
    }
}
