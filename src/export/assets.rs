use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

/// Downloads referenced media next to the output file and hands out local
/// paths in place of remote URLs.
///
/// Every failure is swallowed: media disappearing from the CDN must never
/// fail an export, so the original URL is returned instead and the document
/// keeps a remote reference.
#[derive(Debug)]
pub(crate) struct AssetDownloader {
    http: reqwest::Client,
    enabled: bool,
    reuse: bool,
    output_dir: PathBuf,
    assets_dir: PathBuf,
    resolved: Mutex<HashMap<String, PathBuf>>,
}

impl AssetDownloader {
    /// Creates a downloader writing into `assets_dir`.
    pub fn new(
        http: reqwest::Client,
        enabled: bool,
        reuse: bool,
        output_dir: PathBuf,
        assets_dir: PathBuf,
    ) -> Self {
        Self { http, enabled, reuse, output_dir, assets_dir, resolved: Mutex::new(HashMap::new()) }
    }

    /// Resolves a remote URL to a local path, downloading on first sight.
    ///
    /// When downloading is disabled the URL is returned unchanged. The
    /// returned path is relative to the output directory when the assets
    /// directory lives inside it, absolute otherwise; HTML callers get each
    /// segment percent-encoded.
    pub async fn resolve(&self, url: &str, percent_encode: bool) -> String {
        if !self.enabled {
            return url.to_owned();
        }

        let mut resolved = self.resolved.lock().await;

        if let Some(path) = resolved.get(url) {
            return self.present(path, percent_encode);
        }

        match self.download(url).await {
            Ok(path) => {
                let presented = self.present(&path, percent_encode);

                resolved.insert(url.to_owned(), path);

                presented
            }
            Err(error) => {
                tracing::warn!(url, %error, "asset download failed; keeping the remote url");

                url.to_owned()
            }
        }
    }

    /// Derives the local file name for a URL: a short content-address of the
    /// URL itself, followed by the original file name.
    fn local_name(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        let prefix = digest.iter().take(5).fold(String::new(), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");

            hex
        });
        let remote_name = url
            .split('/')
            .next_back()
            .unwrap_or("asset")
            .split(['?', '#'])
            .next()
            .unwrap_or("asset");

        format!("{prefix}-{}", super::path::escape_segment(remote_name))
    }

    async fn download(&self, url: &str) -> crate::Result<PathBuf> {
        let path = self.assets_dir.join(Self::local_name(url));

        if self.reuse && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.assets_dir).await?;

        let response = self.http.get(url).send().await.map_err(|source| {
            crate::Error::Transport { route: url.to_owned(), attempts: 1, source }
        })?;
        let response = response.error_for_status().map_err(|source| {
            crate::Error::Transport { route: url.to_owned(), attempts: 1, source }
        })?;
        let bytes = response.bytes().await.map_err(|source| crate::Error::Transport {
            route: url.to_owned(),
            attempts: 1,
            source,
        })?;

        tokio::fs::write(&path, &bytes).await?;

        Ok(path)
    }

    /// Shapes a stored path for embedding into a document.
    fn present(&self, path: &Path, percent_encode: bool) -> String {
        let presented = path.strip_prefix(&self.output_dir).map_or_else(
            |_| path.to_path_buf(),
            Path::to_path_buf,
        );
        let segments: Vec<String> = presented
            .components()
            .map(|component| {
                let segment = component.as_os_str().to_string_lossy();

                if percent_encode {
                    urlencoding::encode(&segment).into_owned()
                } else {
                    segment.into_owned()
                }
            })
            .collect();

        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_names_are_stable_and_keep_the_extension() {
        let first = AssetDownloader::local_name("https://cdn.example.com/a/b/photo.png?ex=1");
        let second = AssetDownloader::local_name("https://cdn.example.com/a/b/photo.png?ex=1");

        assert_eq!(first, second);
        assert!(first.ends_with("-photo.png"));
    }

    #[test]
    fn different_urls_get_different_names() {
        let first = AssetDownloader::local_name("https://cdn.example.com/1/photo.png");
        let second = AssetDownloader::local_name("https://cdn.example.com/2/photo.png");

        assert_ne!(first, second);
    }
}
