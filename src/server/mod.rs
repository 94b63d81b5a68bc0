mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(api::search_handler, api::reindex_handler, api::metrics_handler),
    components(schemas(types::SearchForm, types::SearchResponse)),
    modifiers(&BearerToken)
)]
pub struct ApiDoc;

struct BearerToken;

impl Modify for BearerToken {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", post(api::search_handler))
        .route("/reindex", post(api::reindex_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：10M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use assert_fs::TempDir;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use image::{GrayImage, Luma};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::CatalogBuilder;
    use crate::config::{ConfDir, SearchOptions};
    use crate::db::NewProduct;

    const TOKEN: &str = "s3cret-token";
    const BOUNDARY: &str = "lookalike-test-boundary";

    fn write_png(path: &Path, descending: bool) -> Vec<u8> {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        GrayImage::from_fn(64, 64, |x, _| {
            let v = (x * 4) as u8;
            Luma([if descending { 255 - v } else { v }])
        })
        .save(path)
        .unwrap();
        std::fs::read(path).unwrap()
    }

    /// 两个商品：红色（左亮右暗）和蓝色（左暗右亮）
    async fn test_app(dir: &TempDir) -> Router {
        let images = dir.path().join("assets/images");
        write_png(&images.join("red.png"), true);
        write_png(&images.join("blue.png"), false);

        let conf_dir: ConfDir = dir.path().to_str().unwrap().parse().unwrap();
        let catalog = CatalogBuilder::new(conf_dir).open().await.unwrap();
        let products = [("红色帆布鞋", "/images/red.png"), ("蓝色帆布鞋", "/images/blue.png")];
        for (title, image_ref) in products {
            let product = NewProduct {
                title: title.to_string(),
                price: 199.0,
                category: Some("shoes".to_string()),
                image_ref: Some(image_ref.to_string()),
            };
            catalog.add_product(&product).await.unwrap();
        }

        let state = AppState::new(
            catalog,
            SearchOptions::default(),
            PathBuf::from("uploads/visual-search"),
            TOKEN.to_string(),
        );
        create_app(state)
    }

    fn search_request(file: &[u8], count: Option<usize>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(count) = count {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"count\"\r\n\r\n{count}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"query.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/search")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn reindex_request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/reindex");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn into_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_search_response_shape() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;
        let query = write_png(&dir.path().join("query.png"), false);

        let response = app.oneshot(search_request(&query, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = into_json(response).await;

        let image_ref = json["query"]["imageRef"].as_str().unwrap();
        assert!(image_ref.starts_with("/uploads/visual-search/"));
        assert!(dir.path().join("assets").join(&image_ref[1..]).is_file());
        assert_eq!(json["query"]["fingerprint"], "0000000000000000");

        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        let first = results[0].as_object().unwrap();
        let mut keys = first.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        assert_eq!(keys, ["category", "distance", "id", "imageRef", "price", "title"]);
        assert_eq!(first["title"], "蓝色帆布鞋");
        assert_eq!(first["imageRef"], "/images/blue.png");
        assert_eq!(first["category"], "shoes");
        assert_eq!(first["distance"], 0);
        assert_eq!(results[1]["distance"], 64);
    }

    #[tokio::test]
    async fn test_search_count() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;
        let query = write_png(&dir.path().join("query.png"), true);

        let response = app.oneshot(search_request(&query, Some(1))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = into_json(response).await;
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["title"], "红色帆布鞋");
    }

    #[tokio::test]
    async fn test_search_undecodable_upload() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let response = app.oneshot(search_request(b"not an image", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = into_json(response).await;
        assert_eq!(json["status"], 400);
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("图片解码失败"));
        assert!(!error.contains(dir.path().to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_search_empty_upload() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let response = app.oneshot(search_request(b"", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reindex_requires_token() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        for token in [None, Some("wrong"), Some("")] {
            let response = app.clone().oneshot(reindex_request(token)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{token:?}");
            assert_eq!(into_json(response).await["status"], 401);
        }

        let response = app.clone().oneshot(reindex_request(Some(TOKEN))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = into_json(response).await;
        assert_eq!(json["updatedCount"], 2);
        assert_eq!(json["totalMissingBeforeRun"], 2);

        let response = app.oneshot(reindex_request(Some(TOKEN))).await.unwrap();
        let json = into_json(response).await;
        assert_eq!(json["updatedCount"], 0);
        assert_eq!(json["totalMissingBeforeRun"], 0);
    }
}
