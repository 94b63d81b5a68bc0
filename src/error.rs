use thiserror::Error;

/// 计算单张图片指纹时可能出现的错误
///
/// 注意：这里的错误信息会直接返回给用户，因此不能包含任何本地文件路径
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// 远程图片下载失败或超时，可以重试
    #[error("图片下载失败: {0}")]
    FetchFailed(String),
    /// 既不是 URL，也无法安全解析为本地资源路径
    #[error("不支持的图片引用")]
    UnsupportedReference,
    /// 图片数据无法解码
    #[error("图片解码失败: {0}")]
    DecodeFailed(#[from] image::ImageError),
}

impl FingerprintError {
    /// 是否值得在下一次回填时重试
    ///
    /// 其余两种错误在修正图片引用或更换图片前必然再次失败
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed(_))
    }

    /// 用于日志和指标的简短标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchFailed(_) => "fetch_failed",
            Self::UnsupportedReference => "unsupported_reference",
            Self::DecodeFailed(_) => "decode_failed",
        }
    }
}

impl From<reqwest::Error> for FingerprintError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest 的错误信息中只有远程 URL，不涉及本地路径
        Self::FetchFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fetch_is_retryable() {
        assert!(FingerprintError::FetchFailed("timeout".into()).is_retryable());
        assert!(!FingerprintError::UnsupportedReference.is_retryable());
        let err = image::load_from_memory(b"not an image").unwrap_err();
        assert!(!FingerprintError::from(err).is_retryable());
    }

    #[test]
    fn test_unsupported_reference_hides_path() {
        let msg = FingerprintError::UnsupportedReference.to_string();
        assert!(!msg.contains('/'));
        assert!(!msg.contains("etc"));
    }
}
