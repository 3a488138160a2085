use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::Result;

/// Body of `GET {base}/code`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeResponse {
    #[serde(default)]
    pub code: Option<Value>,
}

impl CodeResponse {
    /// The issued code as text, empty when the server sent none.
    pub fn link_code(&self) -> String {
        self.code.as_ref().and_then(scalar_text).unwrap_or_default()
    }
}

/// Body of `GET {base}/user?code=...`.
///
/// A missing, empty or zero `token` means the code has not been linked yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub token: Option<Value>,
}

impl UserResponse {
    pub fn linked_token(&self) -> Option<String> {
        self.token.as_ref().and_then(scalar_text)
    }
}

/// Text of a non-empty string or non-zero number. Anything else reads as unset.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Remote identity API consumed by a [`LinkSession`](super::LinkSession).
#[async_trait]
pub trait LinkApi: Send + Sync {
    /// Ask the server for a fresh link code.
    async fn request_code(&self) -> Result<CodeResponse>;

    /// Ask whether `code` has been linked to an account.
    async fn poll_user(&self, code: &str) -> Result<UserResponse>;

    /// Fetch the account record for a bearer `token`.
    async fn fetch_account(&self, token: &str) -> Result<Value>;
}

/// reqwest-backed [`LinkApi`] for the Rotur endpoints.
///
/// Only transport and JSON-decode failures are errors. A non-2xx response
/// whose body still decodes is treated like any other reply.
///
/// # Example
/// ```no_run
/// use warplink::link::{HttpLinkClient, LinkApi};
///
/// # async fn example() -> warplink::error::Result<()> {
/// let client = HttpLinkClient::new()?.with_api_base("http://localhost:8080/link");
/// let code = client.request_code().await?;
/// println!("{}", code.link_code());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpLinkClient {
    client: reqwest::Client,
    api_base: String,
    me_endpoint: String,
}

impl HttpLinkClient {
    pub fn new() -> Result<Self> {
        Self::from_config(&LinkConfig::default())
    }

    pub fn from_config(config: &LinkConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_base: config.api_base_trimmed().to_string(),
            me_endpoint: config.me_endpoint.clone(),
        })
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_me_endpoint(mut self, url: impl Into<String>) -> Self {
        self.me_endpoint = url.into();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn get_json<T>(&self, request: reqwest::RequestBuilder, what: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let resp = request.header("Accept", "application/json").send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!(%status, endpoint = what, "link API returned non-success status");
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl LinkApi for HttpLinkClient {
    async fn request_code(&self) -> Result<CodeResponse> {
        let url = format!("{}/code", self.api_base);
        self.get_json(self.client.get(url), "code").await
    }

    async fn poll_user(&self, code: &str) -> Result<UserResponse> {
        let url = format!("{}/user", self.api_base);
        self.get_json(self.client.get(url).query(&[("code", code)]), "user")
            .await
    }

    async fn fetch_account(&self, token: &str) -> Result<Value> {
        self.get_json(
            self.client.get(&self.me_endpoint).query(&[("auth", token)]),
            "me",
        )
        .await
    }
}
