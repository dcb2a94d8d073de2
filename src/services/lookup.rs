use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::LookupConfig;
use crate::errors::{AppError, AppResult};
use tracing;

/// A transient file holding one lookup result. Removed from disk when the
/// handle is dropped, i.e. once the document has been delivered (or the
/// delivery attempt abandoned).
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "response.txt".to_string())
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove artifact {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Relays one-argument queries to the external lookup API and materializes
/// the raw JSON response as an artifact for delivery.
pub struct LookupService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    resource: String,
    artifacts_dir: PathBuf,
}

impl LookupService {
    pub fn new(config: &LookupConfig) -> Self {
        // A single failed or slow attempt is surfaced immediately; no retries.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            resource: config.resource.clone(),
            artifacts_dir: PathBuf::from(&config.artifacts_dir),
        }
    }

    pub async fn lookup(&self, argument: &str) -> AppResult<Artifact> {
        if argument.is_empty() || !argument.chars().all(char::is_alphanumeric) {
            return Err(AppError::Usage(
                "Please use /query followed by a single value. Example: /query 86914804168",
            ));
        }

        let url = format!(
            "{}/{}/{}/{}",
            self.base_url, self.api_key, self.resource, argument
        );
        tracing::debug!("Relaying lookup for argument {}", argument);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::External(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::External(format!("lookup returned {}", status)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("malformed response body: {}", e)))?;

        self.write_artifact(argument, &body)
    }

    fn write_artifact(&self, argument: &str, body: &serde_json::Value) -> AppResult<Artifact> {
        fs::create_dir_all(&self.artifacts_dir).map_err(|e| {
            AppError::Persistence(format!("create {}: {}", self.artifacts_dir.display(), e))
        })?;

        let path = self.artifacts_dir.join(format!("response_{}.txt", argument));
        let pretty = serde_json::to_string_pretty(body)
            .map_err(|e| AppError::External(format!("serialize response: {}", e)))?;

        if let Err(e) = fs::write(&path, pretty) {
            // Never leave a partial artifact behind on a failed write.
            let _ = fs::remove_file(&path);
            return Err(AppError::Persistence(format!(
                "write {}: {}",
                path.display(),
                e
            )));
        }

        Ok(Artifact::new(path))
    }
}
