use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::CacheError;

use super::CacheStore;

/// Redis reached through the Upstash REST interface.
///
/// Each command is posted as a JSON array to the database URL, e.g.
/// `["SET", "weather:paris", "{...}", "EX", "600"]`, and answered with
/// `{"result": ...}` or `{"error": "..."}`.
#[derive(Clone)]
pub struct UpstashCache {
    url: String,
    token: String,
    http: Client,
}

impl std::fmt::Debug for UpstashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashCache").field("url", &self.url).finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct UpstashReply {
    result: Option<Value>,
    error: Option<String>,
}

impl UpstashCache {
    pub fn new(url: String, token: String) -> Result<Self, CacheError> {
        let http = Client::builder().build()?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    async fn command(&self, args: Value) -> Result<Option<Value>, CacheError> {
        let res = self.http.post(&self.url).bearer_auth(&self.token).json(&args).send().await?;

        let status = res.status();
        let reply: Option<UpstashReply> = res.json().await.ok();

        match reply {
            Some(UpstashReply { error: Some(message), .. }) => Err(CacheError::Backend(message)),
            _ if !status.is_success() => Err(CacheError::Status(status.as_u16())),
            Some(reply) => Ok(reply.result),
            None => Err(CacheError::Backend("unreadable reply".to_string())),
        }
    }
}

#[async_trait]
impl CacheStore for UpstashCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.command(json!(["GET", key])).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(CacheError::Backend(format!("unexpected GET result: {other}"))),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let secs = ttl.as_secs().max(1).to_string();
        self.command(json!(["SET", key, value, "EX", secs])).await?;
        Ok(())
    }
}
