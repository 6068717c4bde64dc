use anyhow::Context;
use common::retry_with_backoff_async;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DOWNLOAD_MAX_RETRIES: u32 = 3;
const DOWNLOAD_BASE_DELAY_MS: u64 = 1000;

/// Where the model directory lives remotely and locally.
#[derive(Debug, Clone)]
pub struct ModelStoreConfig {
    /// Object store base URL, e.g. "https://storage.example.com"
    pub endpoint: String,
    pub bucket: String,
    /// Key prefix of the model directory, e.g. "models/gender-classification-final"
    pub prefix: String,
    pub local_dir: PathBuf,
}

/// File list at `{prefix}/manifest.json`; object listing is out of scope,
/// so the store publishes its own index.
#[derive(Debug, Deserialize)]
struct Manifest {
    files: Vec<String>,
}

/// Downloads the model directory from an HTTP object store on first startup.
pub struct ModelStore {
    client: reqwest::Client,
    config: ModelStoreConfig,
}

impl ModelStore {
    pub fn new(config: ModelStoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Sync the model directory if it is absent locally.
    ///
    /// Files are staged into a sibling directory and renamed into place at
    /// the end, so an interrupted sync never leaves a directory that passes
    /// the presence check on the next startup.
    pub async fn sync_if_missing(&self) -> anyhow::Result<PathBuf> {
        if self.config.local_dir.exists() {
            tracing::info!(
                dir = %self.config.local_dir.display(),
                "Model directory already present, skipping download"
            );
            return Ok(self.config.local_dir.clone());
        }

        tracing::info!(
            bucket = %self.config.bucket,
            prefix = %self.config.prefix,
            "Downloading model directory from object store"
        );

        let manifest = self.fetch_manifest().await?;
        if manifest.files.is_empty() {
            anyhow::bail!("model manifest at {} lists no files", self.object_url("manifest.json"));
        }

        let staging = self.staging_dir();
        if staging.exists() {
            tokio::fs::remove_dir_all(&staging).await?;
        }
        tokio::fs::create_dir_all(&staging).await?;

        for name in &manifest.files {
            let bytes = retry_with_backoff_async(
                || self.fetch_object(name),
                DOWNLOAD_MAX_RETRIES,
                DOWNLOAD_BASE_DELAY_MS,
                name,
            )
            .await?;

            let file_name = Path::new(name)
                .file_name()
                .with_context(|| format!("manifest entry has no file name: {}", name))?;
            let local_path = staging.join(file_name);
            tokio::fs::write(&local_path, &bytes).await?;

            tracing::info!(
                object = %name,
                path = %local_path.display(),
                bytes = bytes.len(),
                "Downloaded model file"
            );
        }

        tokio::fs::rename(&staging, &self.config.local_dir).await?;
        tracing::info!("Model download completed");

        Ok(self.config.local_dir.clone())
    }

    fn staging_dir(&self) -> PathBuf {
        let mut name = self
            .config
            .local_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "model".into());
        name.push(".download");
        self.config.local_dir.with_file_name(name)
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            self.config.prefix.trim_matches('/'),
            name
        )
    }

    async fn fetch_manifest(&self) -> anyhow::Result<Manifest> {
        let url = self.object_url("manifest.json");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("failed to fetch model manifest from {}", url))?;

        Ok(response.json().await?)
    }

    async fn fetch_object(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        let url = self.object_url(name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("failed to fetch {}", url))?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to build a store pointing at an endpoint that must never be hit
    fn unreachable_store(local_dir: PathBuf) -> ModelStore {
        ModelStore::new(ModelStoreConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            bucket: "models-bucket".to_string(),
            prefix: "models/gender-classification-final".to_string(),
            local_dir,
        })
    }

    #[test]
    fn test_object_url_joins_cleanly() {
        let store = ModelStore::new(ModelStoreConfig {
            endpoint: "https://storage.example.com/".to_string(),
            bucket: "models-bucket".to_string(),
            prefix: "/models/gender-classification-final/".to_string(),
            local_dir: PathBuf::from("./model"),
        });

        assert_eq!(
            store.object_url("config.json"),
            "https://storage.example.com/models-bucket/models/gender-classification-final/config.json",
            "Stray slashes in endpoint/prefix should not produce double slashes"
        );
    }

    #[test]
    fn test_manifest_parsing() {
        let manifest: Manifest =
            serde_json::from_str(r#"{"files": ["model.onnx", "config.json"]}"#).unwrap();
        assert_eq!(manifest.files, vec!["model.onnx", "config.json"]);
    }

    #[test]
    fn test_staging_dir_is_sibling_of_target() {
        let store = unreachable_store(PathBuf::from("/data/model"));
        assert_eq!(store.staging_dir(), PathBuf::from("/data/model.download"));
    }

    #[tokio::test]
    async fn test_sync_skips_when_directory_present() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");
        std::fs::create_dir(&model_dir).unwrap();

        // The endpoint is unreachable, so reaching the network would error:
        // an Ok result proves the presence check short-circuited.
        let store = unreachable_store(model_dir.clone());
        let synced = store.sync_if_missing().await.unwrap();

        assert_eq!(synced, model_dir);
    }

    #[tokio::test]
    async fn test_sync_fails_when_endpoint_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");

        let store = unreachable_store(model_dir.clone());
        let result = store.sync_if_missing().await;

        assert!(result.is_err(), "No server, no manifest, no sync");
        assert!(
            !model_dir.exists(),
            "A failed sync must not create the model directory"
        );
    }
}
