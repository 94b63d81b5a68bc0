use anyhow::Result;
use clap::{Parser, ValueEnum};

use super::{catalog_builder, read_query_image};
use crate::catalog::SimilarProduct;
use crate::cli::SubCommandExtend;
use crate::config::{Opts, SearchOptions, SourceOptions};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub source: SourceOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 查询图片的引用，可以是 URL 或资源目录下的相对路径
    pub image: String,
    /// 将参数视为本地文件，不经过资源目录
    #[arg(short, long)]
    pub file: bool,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let catalog = catalog_builder(opts, &self.source).open().await?;
        let data = read_query_image(catalog.source(), &self.image, self.file).await?;
        let (hash, result) = catalog.search(data, &self.search).await?;
        print_result(&hash.to_hex(), &result, self.output_format)
    }
}

fn print_result(hash: &str, result: &[SimilarProduct], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({ "fingerprint": hash, "results": result });
            println!("{}", serde_json::to_string_pretty(&value)?)
        }
        OutputFormat::Table => {
            for p in result {
                println!("{}\t{}\t{}", p.distance, p.id, p.title);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
