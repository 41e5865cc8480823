#![cfg(feature = "client")]

use crate::error::{Result, VisualizerError};
use crate::store::UploadedDataset;
use crate::summary::Summary;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Body of a successful upload
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub message: String,
    pub summary: Summary,
    pub dataset_id: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    detail: Option<String>,
}

/// HTTP client for the equipment API
///
/// Every failure, including non-success statuses, comes back as
/// `Transport` with a short human-readable message.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:8000/api`)
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("Token {}", self.token),
        )
    }

    /// Upload a CSV file from disk
    ///
    /// An unreadable local file is reported as `Transport`, like any other
    /// client failure.
    pub async fn upload(&self, path: &Path) -> Result<UploadReceipt> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| transport(format!("cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        self.upload_bytes(&file_name, data).await
    }

    /// Upload an in-memory CSV body under the given file name
    pub async fn upload_bytes(&self, file_name: &str, data: Vec<u8>) -> Result<UploadReceipt> {
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(transport)?;
        let form = Form::new().part("file", part);

        let response = self
            .authorized(self.http.post(self.url("upload")))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    /// The most recent dataset, or `None` when the server has none yet
    pub async fn latest_summary(&self) -> Result<Option<UploadedDataset>> {
        let response = self
            .authorized(self.http.get(self.url("summary/latest")))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    /// Recent datasets, most recent first
    pub async fn history(&self) -> Result<Vec<UploadedDataset>> {
        let response = self
            .authorized(self.http.get(self.url("history")))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    /// Fetch the PDF report of one dataset
    pub async fn download_report(&self, id: u64) -> Result<Vec<u8>> {
        let response = self
            .authorized(self.http.get(self.url(&format!("report/{}", id))))
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

fn transport(e: impl std::fmt::Display) -> VisualizerError {
    VisualizerError::Transport(e.to_string())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(VisualizerError::Transport(error_message(status, &text)))
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;
    response.json::<T>().await.map_err(transport)
}

/// Short status text for a failed response
pub fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error,
            detail: Some(detail),
        }) => format!("{} ({}): {}", error, status.as_u16(), detail),
        Ok(ErrorBody { error, detail: None }) => format!("{} ({})", error, status.as_u16()),
        Err(_) => format!("request failed with status {}", status.as_u16()),
    }
}
