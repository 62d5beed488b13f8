//! Хранилища статических аудиофайлов

use std::path::PathBuf;
use async_trait::async_trait;
use reqwest::Client;
use crate::playback::AudioHandle;

/// Хранилище, где лежат предзаписанные файлы
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Существует ли файл по относительному пути
    async fn exists(&self, relative: &str) -> bool;

    /// Дескриптор для воспроизведения файла
    fn handle(&self, relative: &str) -> AudioHandle;
}

/// Файлы в локальной директории
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn exists(&self, relative: &str) -> bool {
        tokio::fs::metadata(self.path(relative))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    fn handle(&self, relative: &str) -> AudioHandle {
        AudioHandle::File(self.path(relative))
    }
}

/// Файлы на веб-сервере; наличие проверяется HEAD-запросом
pub struct HttpAssetStore {
    base_url: String,
    client: Client,
}

impl HttpAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, relative: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn exists(&self, relative: &str) -> bool {
        let url = self.url(relative);
        match self.client.head(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }

    fn handle(&self, relative: &str) -> AudioHandle {
        AudioHandle::Url(self.url(relative))
    }
}
