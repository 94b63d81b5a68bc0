use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 商品记录
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// 商品 ID
    pub id: i64,
    /// 商品名称
    pub title: String,
    /// 价格
    pub price: f64,
    /// 分类
    pub category: Option<String>,
    /// 主图引用，URL 或资源目录下的相对路径
    pub image_ref: Option<String>,
    /// 16 位十六进制的 dHash，为空表示尚未计算
    pub fingerprint: Option<String>,
}

/// 指纹计算只需要的字段
#[derive(Debug, Clone, FromRow)]
pub struct ProductImageRecord {
    pub id: i64,
    pub image_ref: String,
}

/// 新增商品
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
}
