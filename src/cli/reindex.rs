use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;

use super::{catalog_builder, pb_style};
use crate::cli::SubCommandExtend;
use crate::config::{Opts, SourceOptions};

#[derive(Parser, Debug, Clone)]
pub struct ReindexCommand {
    #[command(flatten)]
    pub source: SourceOptions,
}

impl SubCommandExtend for ReindexCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let catalog = catalog_builder(opts, &self.source).open().await?;

        let pb = ProgressBar::no_length().with_style(pb_style());
        let report = catalog.reindex(&pb).await?;
        pb.finish_with_message("重建索引完成");

        println!("{}", serde_json::to_string(&report)?);
        Ok(())
    }
}
