use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

use crate::error::FingerprintError;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// API错误类型
#[derive(Debug)]
pub enum AppError {
    /// 缺少或错误的鉴权 token
    Unauthorized,
    /// 请求本身有问题
    BadRequest(String),
    Other(anyhow::Error),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "鉴权失败".to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // 图片相关的错误信息不含本地路径，可以直接展示给用户
            Self::Other(err) => match err.downcast_ref::<FingerprintError>() {
                Some(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                None => (StatusCode::INTERNAL_SERVER_ERROR, "服务器内部错误".to_string()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            if let Self::Other(err) = &self {
                error!("请求处理失败: {err:?}");
            }
        }
        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Other(err.into())
    }
}
