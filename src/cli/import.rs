use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use super::catalog_builder;
use crate::cli::SubCommandExtend;
use crate::config::{Opts, SourceOptions};
use crate::db::NewProduct;

#[derive(Parser, Debug, Clone)]
pub struct ImportCommand {
    #[command(flatten)]
    pub source: SourceOptions,
    /// JSON 文件，内容为商品数组
    /// 例：[{"title": "帆布鞋", "price": 199, "category": "shoes", "imageRef": "/images/1.jpg"}]
    #[arg(verbatim_doc_comment)]
    pub file: PathBuf,
}

impl SubCommandExtend for ImportCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let data = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("无法读取 {}", self.file.display()))?;
        let products: Vec<NewProduct> = serde_json::from_slice(&data)?;

        let catalog = catalog_builder(opts, &self.source).open().await?;
        let ids = catalog.add_products(&products).await?;
        info!("导入完成，共 {} 个商品", ids.len());
        println!("{}", ids.len());
        Ok(())
    }
}
