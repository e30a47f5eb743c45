//! HTTP client for a repository contents API.

use crate::content_api::{ContentApi, ContentFile, DirEntry, PutFileRequest};
use crate::RemoteConfig;
use bills_core::error::StorageError;
use bills_core::ports::Result;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// Blocking client for `{api_url}/repos/{owner}/{repo}/contents/{path}`.
pub struct HttpContentApi {
    client: Client,
    contents_url: Url,
    branch: Option<String>,
    token: String,
}

impl HttpContentApi {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let base = format!(
            "{}/repos/{}/{}/contents",
            config.api_url.trim_end_matches('/'),
            config.owner,
            config.repo
        );
        let contents_url = Url::parse(&base)
            .map_err(|e| StorageError::Unavailable(format!("invalid api url {base:?}: {e}")))?;

        Ok(Self {
            client,
            contents_url,
            branch: config.branch.clone(),
            token: config.token.clone(),
        })
    }

    /// Builds the URL for a content path, percent-encoding each segment.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let mut url = self.contents_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StorageError::Unavailable(format!(
                    "api url cannot be a base: {}",
                    self.contents_url
                ))
            })?
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(ACCEPT, "application/vnd.github+json");
        if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        }
    }

    fn get(&self, path: &str) -> Result<Response> {
        let mut request = self.authorized(self.client.get(self.url_for(path)?));
        if let Some(branch) = &self.branch {
            request = request.query(&[("ref", branch)]);
        }
        debug!(path, "GET content");
        request
            .send()
            .map_err(|e| StorageError::Transport(e.to_string()))
    }
}

/// Maps a non-success response status to a storage error. Rejections of a
/// conditional write become conflicts.
pub fn error_for_status(
    status: StatusCode,
    body: String,
    path: &str,
    writing: bool,
) -> StorageError {
    match status {
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED | StatusCode::UNPROCESSABLE_ENTITY
            if writing =>
        {
            StorageError::conflict(path)
        }
        _ => StorageError::Remote {
            status: status.as_u16(),
            message: body,
        },
    }
}

fn into_error(response: Response, path: &str, writing: bool) -> StorageError {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    error_for_status(status, body, path, writing)
}

impl ContentApi for HttpContentApi {
    fn get_file(&self, path: &str) -> Result<Option<ContentFile>> {
        let response = self.get(path)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<ContentFile>().map(Some).map_err(|e| {
                    StorageError::Encoding(format!("unexpected response for {path}: {e}"))
                })
            }
            _ => Err(into_error(response, path, false)),
        }
    }

    fn put_file(&self, path: &str, request: &PutFileRequest) -> Result<()> {
        debug!(path, replacing = ?request.sha, "PUT content");
        let response = self
            .authorized(self.client.put(self.url_for(path)?))
            .json(request)
            .send()
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(into_error(response, path, true))
        }
    }

    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let response = self.get(path)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => response.json::<Vec<DirEntry>>().map_err(|e| {
                StorageError::Encoding(format!("{path} is not a directory listing: {e}"))
            }),
            _ => Err(into_error(response, path, false)),
        }
    }
}
