mod hash;
mod import;
mod reindex;
mod search;
mod server;

pub use hash::*;
pub use import::*;
pub use reindex::*;
pub use search::*;
pub use server::*;

use indicatif::ProgressStyle;
use log::debug;

use crate::CatalogBuilder;
use crate::config::{Opts, SourceOptions};
use crate::source::ImageSource;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 按命令行参数打开商品目录
fn catalog_builder(opts: &Opts, source: &SourceOptions) -> CatalogBuilder {
    CatalogBuilder::new(opts.conf_dir.clone())
        .asset_root(source.asset_root.clone())
        .fetch_timeout(source.timeout())
}

/// 读取命令行给出的查询图片
///
/// `local_file` 为真时按本地文件读取，否则按图片引用解析
async fn read_query_image(
    source: &ImageSource,
    image: &str,
    local_file: bool,
) -> anyhow::Result<Vec<u8>> {
    if local_file {
        debug!("按本地文件读取: {}", image);
        return Ok(tokio::fs::read(image).await?);
    }
    Ok(source.resolve(image).await?)
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .expect("invalid progress template")
        .progress_chars("#>-")
}
