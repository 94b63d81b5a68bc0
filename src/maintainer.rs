use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{Catalog, fingerprint_bytes};
use crate::db::{ProductImageRecord, crud};
use crate::error::FingerprintError;
use crate::metrics;

/// 单个商品的处理结果
///
/// 数据库本身出错时不会出现在这里，而是作为 `Err` 中止整个批次
#[derive(Debug)]
pub enum IndexOutcome {
    /// 已写入新的指纹
    Updated(String),
    /// 图片有问题，跳过，下次回填时还会重试
    Skipped(FingerprintError),
    /// 计算期间主图已被修改，结果作废
    Superseded,
}

/// 回填统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub attempted: u64,
    pub updated: u64,
}

/// 重建索引统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReindexReport {
    /// 本次成功写入的指纹数量
    pub updated_count: u64,
    /// 开始前缺少指纹的商品数量
    pub total_missing_before_run: u64,
}

impl Catalog {
    /// 计算并保存单个商品的指纹
    pub async fn index_record(
        &self,
        record: &ProductImageRecord,
    ) -> Result<IndexOutcome, sqlx::Error> {
        let hash = match self.source.resolve(&record.image_ref).await {
            Ok(data) => fingerprint_bytes(data).await,
            Err(e) => Err(e),
        };
        let outcome = match hash {
            Ok(hash) => {
                let hex = hash.to_hex();
                if crud::set_fingerprint(&self.db, record.id, &record.image_ref, &hex).await? {
                    debug!("商品 {} 指纹: {}", record.id, hex);
                    IndexOutcome::Updated(hex)
                } else {
                    info!("商品 {} 的主图已变更，丢弃旧指纹 {}", record.id, hex);
                    IndexOutcome::Superseded
                }
            }
            Err(e) => {
                warn!("商品 {} 指纹计算失败 ({}): {}", record.id, e.kind(), e);
                IndexOutcome::Skipped(e)
            }
        };
        metrics::inc_fingerprint(&outcome);
        Ok(outcome)
    }

    /// 搜索时顺带补算最多 `batch` 个商品的指纹
    ///
    /// 逐个处理，单个失败不影响后续。并发的搜索可能会重复处理同一批商品，
    /// 因为结果是确定的，重复写入没有副作用。
    /// 调用方放弃该 future 时剩余商品不再处理，已写入的指纹保留
    pub async fn backfill(&self, batch: usize) -> Result<BackfillReport, sqlx::Error> {
        let records = crud::get_unindexed(&self.db, Some(batch)).await?;
        let mut report = BackfillReport::default();
        for record in &records {
            report.attempted += 1;
            if let IndexOutcome::Updated(_) = self.index_record(record).await? {
                report.updated += 1;
            }
        }
        if report.attempted > 0 {
            info!("回填指纹: {}/{}", report.updated, report.attempted);
        }
        Ok(report)
    }

    /// 为所有缺少指纹的商品计算指纹
    ///
    /// 不限制数量和耗时，单个失败只计数不中止
    pub async fn reindex(&self, pb: &ProgressBar) -> Result<ReindexReport, sqlx::Error> {
        let records = crud::get_unindexed(&self.db, None).await?;
        let mut report =
            ReindexReport { updated_count: 0, total_missing_before_run: records.len() as u64 };
        info!("共 {} 个商品缺少指纹", report.total_missing_before_run);

        pb.set_length(report.total_missing_before_run);
        for record in &records {
            match self.index_record(record).await? {
                IndexOutcome::Updated(_) => {
                    report.updated_count += 1;
                    pb.set_message(format!("商品 {}", record.id));
                }
                IndexOutcome::Skipped(e) => {
                    pb.set_message(format!("跳过商品 {}: {}", record.id, e.kind()));
                }
                IndexOutcome::Superseded => {
                    pb.set_message(format!("商品 {} 主图已变更", record.id));
                }
            }
            pb.inc(1);
        }

        info!(
            "重建索引完成: {}/{}",
            report.updated_count, report.total_missing_before_run
        );
        Ok(report)
    }
}
