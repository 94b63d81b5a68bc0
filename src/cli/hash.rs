use anyhow::Result;
use clap::Parser;

use super::read_query_image;
use crate::catalog::fingerprint_bytes;
use crate::cli::SubCommandExtend;
use crate::config::{Opts, SourceOptions};
use crate::source::ImageSource;

#[derive(Parser, Debug, Clone)]
pub struct HashCommand {
    #[command(flatten)]
    pub source: SourceOptions,
    /// 图片引用，可以是 URL 或资源目录下的相对路径
    pub image: String,
    /// 将参数视为本地文件，不经过资源目录
    #[arg(short, long)]
    pub file: bool,
}

impl SubCommandExtend for HashCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let root = self.source.asset_root.clone().unwrap_or_else(|| opts.conf_dir.assets());
        let source = ImageSource::new(root, self.source.timeout())?;
        let data = read_query_image(&source, &self.image, self.file).await?;
        let hash = fingerprint_bytes(data).await?;
        println!("{}", hash);
        Ok(())
    }
}
