use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info};
use serde::Serialize;
use tokio::task::spawn_blocking;
use utoipa::ToSchema;

use crate::config::{ConfDir, SearchOptions};
use crate::db::{self, Database, NewProduct, ProductRecord, crud};
use crate::dhash::{DHash, d_hash};
use crate::error::FingerprintError;
use crate::hamming::{LinearScan, Ranker};
use crate::metrics;
use crate::source::ImageSource;

pub struct CatalogBuilder {
    conf_dir: ConfDir,
    asset_root: Option<PathBuf>,
    fetch_timeout: Duration,
}

impl CatalogBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self { conf_dir, asset_root: None, fetch_timeout: Duration::from_secs(10) }
    }

    /// 本地图片资源根目录，默认为 `<conf_dir>/assets`
    pub fn asset_root(mut self, asset_root: Option<PathBuf>) -> Self {
        self.asset_root = asset_root;
        self
    }

    /// 单张图片的读取超时
    pub fn fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub async fn open(self) -> Result<Catalog> {
        if !self.conf_dir.path().exists() {
            std::fs::create_dir_all(self.conf_dir.path())?;
        }
        let db = db::init_db(self.conf_dir.database()).await?;
        let asset_root = self.asset_root.unwrap_or_else(|| self.conf_dir.assets());
        debug!("图片资源目录: {}", asset_root.display());
        let source = ImageSource::new(asset_root, self.fetch_timeout)?;
        Ok(Catalog { db, source })
    }
}

/// 商品目录及其图片指纹
pub struct Catalog {
    pub(crate) db: Database,
    pub(crate) source: ImageSource,
}

/// 搜索结果中的一个商品
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarProduct {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub image_ref: Option<String>,
    pub category: Option<String>,
    /// 汉明距离，范围为 0 到 64
    pub distance: u32,
}

impl Catalog {
    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// 添加商品
    pub async fn add_product(&self, product: &NewProduct) -> Result<i64> {
        Ok(crud::add_product(&self.db, product).await?)
    }

    /// 批量添加商品，要么全部成功，要么全部失败
    pub async fn add_products(&self, products: &[NewProduct]) -> Result<Vec<i64>> {
        let mut tx = self.db.begin().await?;
        let mut ids = Vec::with_capacity(products.len());
        for product in products {
            ids.push(crud::add_product(&mut *tx, product).await?);
        }
        tx.commit().await?;
        Ok(ids)
    }

    /// 修改商品主图，旧指纹随之失效
    pub async fn update_image_ref(&self, id: i64, image_ref: Option<&str>) -> Result<bool> {
        Ok(crud::update_image_ref(&self.db, id, image_ref).await?)
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<ProductRecord>> {
        Ok(crud::get_product(&self.db, id).await?)
    }

    /// 未计算指纹的商品数量
    pub async fn count_unindexed(&self) -> Result<u64> {
        Ok(crud::count_unindexed(&self.db).await?)
    }

    pub async fn count_products(&self) -> Result<u64> {
        Ok(crud::count_products(&self.db).await?)
    }

    /// 读取图片引用并计算指纹
    pub async fn fingerprint_ref(&self, reference: &str) -> Result<DHash, FingerprintError> {
        let data = self.source.resolve(reference).await?;
        fingerprint_bytes(data).await
    }

    /// 搜索与上传图片相似的商品
    ///
    /// 1. 计算查询图片的指纹，失败时直接返回错误
    /// 2. 补算最多 `backfill_batch` 个商品的指纹
    /// 3. 对所有已有指纹的商品排序，返回最近的 `count` 个
    ///
    /// 返回的错误中，[`FingerprintError`] 说明上传的图片有问题，其余为内部错误
    pub async fn search(
        &self,
        image: Vec<u8>,
        opts: &SearchOptions,
    ) -> Result<(DHash, Vec<SimilarProduct>)> {
        let start = Instant::now();

        let query = fingerprint_bytes(image).await?;
        debug!("查询图片指纹: {}", query);

        if opts.backfill_batch > 0 {
            self.backfill(opts.backfill_batch).await?;
        }

        let result = self.rank(&query, opts.count).await?;

        let elapsed = start.elapsed().as_secs_f32();
        metrics::inc_search(elapsed);
        info!("搜索完成: {} 个结果，耗时 {:.3}s", result.len(), elapsed);

        Ok((query, result))
    }

    /// 将上传的图片保存到资源目录下的 `dir` 中，返回可以被 [`ImageSource`] 读取的引用
    ///
    /// 文件名为内容的 blake3 哈希，重复上传同一张图片不会产生新文件
    pub async fn save_upload(&self, dir: &Path, data: &[u8]) -> Result<String> {
        let ext = image::guess_format(data)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("bin");
        let relative = dir.join(format!("{}.{}", blake3::hash(data).to_hex(), ext));
        let path = self.source.asset_root().join(&relative);
        if !tokio::fs::try_exists(&path).await? {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, data).await?;
        }
        let relative = relative.iter().map(|s| s.to_string_lossy()).collect::<Vec<_>>().join("/");
        Ok(format!("/{}", relative))
    }

    /// 在已有指纹的商品中查找最近的 k 个
    pub async fn rank(&self, query: &DHash, k: usize) -> Result<Vec<SimilarProduct>> {
        let products = crud::get_indexed(&self.db).await?;
        let query = query.to_hex();
        let neighbors = LinearScan.rank(
            &query,
            products.iter().enumerate().map(|(i, p)| (i, p.fingerprint.as_deref())),
            k,
        );
        Ok(neighbors
            .into_iter()
            .map(|n| {
                let p = &products[n.id];
                SimilarProduct {
                    id: p.id,
                    title: p.title.clone(),
                    price: p.price,
                    image_ref: p.image_ref.clone(),
                    category: p.category.clone(),
                    distance: n.distance,
                }
            })
            .collect())
    }
}

/// 在阻塞线程中解码图片并计算指纹
pub async fn fingerprint_bytes(data: Vec<u8>) -> Result<DHash, FingerprintError> {
    match spawn_blocking(move || d_hash(&data)).await {
        Ok(result) => result,
        // 解码过程 panic 时按无法解码处理
        Err(e) => Err(FingerprintError::DecodeFailed(image::ImageError::IoError(
            std::io::Error::other(e.to_string()),
        ))),
    }
}
