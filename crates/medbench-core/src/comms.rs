//! Benchmark server client.
//!
//! The artifact store falls back to [`Comms`] when a benchmark or cube is not
//! cached locally, and result submission uploads through it.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::MedbenchConfig;
use crate::domain::error::{MedbenchError, Result};
use crate::domain::{Benchmark, CubeMetadata, ResultRecord};

/// Remote source of benchmark metadata and cubes.
#[async_trait]
pub trait Comms: Send + Sync {
    async fn get_benchmark(&self, uid: u64) -> Result<Benchmark>;

    /// Model uids associated with a benchmark, excluding the reference model.
    async fn get_benchmark_models(&self, uid: u64) -> Result<Vec<String>>;

    async fn get_cube_metadata(&self, uid: &str) -> Result<CubeMetadata>;

    /// Raw manifest bytes for a cube.
    async fn download_manifest(&self, metadata: &CubeMetadata) -> Result<Vec<u8>>;

    /// Upload results; returns the server-side result id.
    async fn upload_result(&self, record: &ResultRecord) -> Result<String>;
}

/// JSON-over-HTTP client for the benchmark server.
pub struct RestComms {
    server_url: String,
    token: Option<String>,
    http_client: reqwest::Client,
}

impl RestComms {
    pub fn new(server_url: &str, token: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("medbench/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(RestComms {
            server_url: server_url.trim_end_matches('/').to_string(),
            token,
            http_client,
        })
    }

    /// Client for the configured server, if one is configured.
    pub fn from_config(cfg: &MedbenchConfig) -> Result<Option<Self>> {
        cfg.server_url
            .as_deref()
            .map(|url| Self::new(url, cfg.auth_token.clone()))
            .transpose()
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let req = self.http_client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, kind: &'static str, uid: &str) -> Result<T> {
        let url = format!("{}/{}", self.server_url, path);
        debug!(url = %url, "GET");
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(MedbenchError::not_found(kind, uid)),
            status if status.is_success() => Ok(response.json::<T>().await?),
            status => Err(MedbenchError::Remote(format!("GET {} returned {}", url, status))),
        }
    }
}

#[async_trait]
impl Comms for RestComms {
    async fn get_benchmark(&self, uid: u64) -> Result<Benchmark> {
        let uid_str = uid.to_string();
        self.get_json(&format!("benchmarks/{}/", uid), "benchmark", &uid_str)
            .await
    }

    async fn get_benchmark_models(&self, uid: u64) -> Result<Vec<String>> {
        let uid_str = uid.to_string();
        self.get_json(&format!("benchmarks/{}/models", uid), "benchmark", &uid_str)
            .await
    }

    async fn get_cube_metadata(&self, uid: &str) -> Result<CubeMetadata> {
        self.get_json(&format!("mlcubes/{}/", uid), "cube", uid).await
    }

    async fn download_manifest(&self, metadata: &CubeMetadata) -> Result<Vec<u8>> {
        let url = metadata.manifest_url.as_deref().ok_or_else(|| MedbenchError::InvalidCube {
            uid: metadata.uid.clone(),
            reason: "no manifest url".to_string(),
        })?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        if !response.status().is_success() {
            return Err(MedbenchError::Remote(format!(
                "manifest download for cube {} returned {}",
                metadata.uid,
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload_result(&self, record: &ResultRecord) -> Result<String> {
        let url = format!("{}/results/", self.server_url);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(record)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MedbenchError::Remote(format!(
                "result upload returned {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response.json().await?;
        submission_id(&body)
    }
}

/// Server-assigned id of an uploaded result, numeric or string.
fn submission_id(body: &serde_json::Value) -> Result<String> {
    match &body["id"] {
        serde_json::Value::Number(id) => Ok(id.to_string()),
        serde_json::Value::String(id) if !id.is_empty() => Ok(id.clone()),
        _ => Err(MedbenchError::Remote(format!(
            "result upload response carries no id: {}",
            body
        ))),
    }
}
