use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::FileId;
use crate::error::FetchError;

/// Bounded exponential backoff: `base_delay * 2^attempt` between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Canonical filename advertised by the portal's Content-Disposition.
    pub filename: String,
    pub path: Utf8PathBuf,
}

pub trait GdcClient: Send + Sync {
    fn download_file(&self, id: &FileId, dest_dir: &Utf8Path)
    -> Result<DownloadedFile, FetchError>;
}

#[derive(Clone)]
pub struct GdcHttpClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    filename_re: Regex,
}

impl GdcHttpClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gdc-sf/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FetchError::GdcHttp(err.to_string()))?,
        );
        // The data endpoint ignores this for binary payloads but expects it
        // to be present.
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| FetchError::GdcHttp(err.to_string()))?;
        let filename_re = Regex::new("filename=(.+)")
            .map_err(|err| FetchError::GdcHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            filename_re,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn data_url(&self, id: &FileId) -> String {
        format!("{}/data/{}", self.base_url, id.as_str())
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, FetchError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "GDC request failed".to_string());
        Err(FetchError::GdcStatus { status, message })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, FetchError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.retry.max_retries && is_retryable_status(status) {
                        thread::sleep(backoff_delay(self.retry.base_delay, attempt));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.retry.max_retries && is_retryable_error(&err) {
                        thread::sleep(backoff_delay(self.retry.base_delay, attempt));
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::GdcHttp(err.to_string()));
                }
            }
        }
    }

    fn filename_from_disposition(&self, id: &FileId, disposition: &str) -> Option<String> {
        let filename = self
            .filename_re
            .captures(disposition)?
            .get(1)?
            .as_str()
            .trim()
            .trim_matches('"')
            .to_string();
        // A name with path separators cannot be placed in the dataset
        // directory, treat it as absent metadata.
        if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
            tracing::warn!(file_id = %id, disposition, "unusable filename in response header");
            return None;
        }
        Some(filename)
    }
}

impl GdcClient for GdcHttpClient {
    fn download_file(
        &self,
        id: &FileId,
        dest_dir: &Utf8Path,
    ) -> Result<DownloadedFile, FetchError> {
        let url = self.data_url(id);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let mut response = Self::handle_status(response)?;

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| self.filename_from_disposition(id, value))
            .ok_or_else(|| FetchError::MissingFilename(id.to_string()))?;
        let path = dest_dir.join(&filename);

        // Stream into a temp file and rename on success, so a failed
        // transfer never leaves a partial file at the target path.
        let mut temp = tempfile::Builder::new()
            .prefix(".gdc-sf")
            .tempfile_in(dest_dir.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| FetchError::GdcHttp(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;

        Ok(DownloadedFile { filename, path })
    }
}

fn backoff_delay(base: Duration, attempt: usize) -> Duration {
    base * 2u32.saturating_pow(attempt as u32)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
