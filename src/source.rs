use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use log::debug;
use regex::Regex;
use reqwest::Client;
use tokio::time::timeout;

use crate::error::FingerprintError;

static RE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://\S+$").expect("failed to build regex"));

/// 是否是绝对 HTTP(S) URL
pub fn is_remote(reference: &str) -> bool {
    RE_URL.is_match(reference)
}

/// 图片来源解析器
///
/// 商品的图片引用要么是远程 URL，要么是相对于本地资源目录的路径
#[derive(Debug, Clone)]
pub struct ImageSource {
    asset_root: PathBuf,
    client: Client,
    timeout: Duration,
}

impl ImageSource {
    pub fn new(asset_root: impl Into<PathBuf>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { asset_root: asset_root.into(), client, timeout })
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// 读取图片引用对应的原始数据
    ///
    /// 无论远程还是本地，单次读取都受超时限制
    pub async fn resolve(&self, reference: &str) -> Result<Vec<u8>, FingerprintError> {
        match timeout(self.timeout, self.resolve_inner(reference)).await {
            Ok(result) => result,
            Err(_) => Err(FingerprintError::FetchFailed(format!(
                "超过 {} 秒未完成",
                self.timeout.as_secs_f32()
            ))),
        }
    }

    async fn resolve_inner(&self, reference: &str) -> Result<Vec<u8>, FingerprintError> {
        if is_remote(reference) {
            return self.fetch(reference).await;
        }
        let path = self.local_path(reference).await?;
        tokio::fs::read(&path).await.map_err(|e| {
            debug!("读取本地图片失败: {e}");
            FingerprintError::UnsupportedReference
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FingerprintError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// 将相对路径解析到资源目录内
    ///
    /// 路径必须存在，且解析符号链接后仍然位于资源目录下
    pub async fn local_path(&self, reference: &str) -> Result<PathBuf, FingerprintError> {
        let relative = reference
            .strip_prefix('/')
            .or_else(|| reference.strip_prefix('\\'))
            .unwrap_or(reference);
        if relative.is_empty() {
            return Err(FingerprintError::UnsupportedReference);
        }

        let root = tokio::fs::canonicalize(&self.asset_root).await.map_err(|e| {
            debug!("资源目录不可用: {e}");
            FingerprintError::UnsupportedReference
        })?;
        let path = tokio::fs::canonicalize(root.join(relative))
            .await
            .map_err(|_| FingerprintError::UnsupportedReference)?;

        if !path.starts_with(&root) {
            debug!("拒绝越界的图片引用: {reference}");
            return Err(FingerprintError::UnsupportedReference);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use assert_fs::TempDir;
    use assert_fs::prelude::*;

    use super::*;

    fn source(root: &Path) -> ImageSource {
        ImageSource::new(root, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://example.com/a.jpg"));
        assert!(is_remote("HTTPS://example.com/a.jpg"));
        assert!(!is_remote("ftp://example.com/a.jpg"));
        assert!(!is_remote("/images/a.jpg"));
        assert!(!is_remote("images/http://a.jpg"));
    }

    #[tokio::test]
    async fn test_resolve_local() {
        let dir = TempDir::new().unwrap();
        dir.child("assets/images/a.jpg").write_binary(b"abc").unwrap();
        let source = source(&dir.path().join("assets"));

        assert_eq!(source.resolve("images/a.jpg").await.unwrap(), b"abc");
        assert_eq!(source.resolve("/images/a.jpg").await.unwrap(), b"abc");
        assert_eq!(source.resolve("images/../images/a.jpg").await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_resolve_escape() {
        let dir = TempDir::new().unwrap();
        dir.child("secret.txt").write_str("secret").unwrap();
        dir.child("assets/images/a.jpg").write_binary(b"abc").unwrap();
        let source = source(&dir.path().join("assets"));

        for reference in ["../secret.txt", "/../secret.txt", "images/../../secret.txt"] {
            let err = source.resolve(reference).await.unwrap_err();
            assert!(matches!(err, FingerprintError::UnsupportedReference), "{reference}");
        }

        let err = source.resolve("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedReference));
        assert!(!err.to_string().contains("passwd"));
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let dir = TempDir::new().unwrap();
        let source = source(dir.path());
        for reference in ["nope.jpg", "", "/", "ftp://example.com/a.jpg"] {
            let err = source.resolve(reference).await.unwrap_err();
            assert!(matches!(err, FingerprintError::UnsupportedReference), "{reference}");
        }
    }

    #[tokio::test]
    async fn test_resolve_directory() {
        let dir = TempDir::new().unwrap();
        dir.child("images").create_dir_all().unwrap();
        let err = source(dir.path()).resolve("images").await.unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedReference));
    }

    #[tokio::test]
    async fn test_resolve_unreachable() {
        let dir = TempDir::new().unwrap();
        // 端口 9 (discard) 通常没有监听
        let err = source(dir.path()).resolve("http://127.0.0.1:9/a.jpg").await.unwrap_err();
        assert!(matches!(err, FingerprintError::FetchFailed(_)));
        assert!(err.is_retryable());
    }
}
