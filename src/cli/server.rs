use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use log::info;
use rand::distr::{Alphanumeric, SampleString};
use tokio::net::TcpListener;

use super::catalog_builder;
use crate::cli::SubCommandExtend;
use crate::config::{SearchOptions, SourceOptions};
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub source: SourceOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
    /// 重建索引接口的鉴权 token，不填则随机生成
    #[arg(long, default_value_t = String::new())]
    pub token: String,
    /// 上传图片的保存目录，相对于资源目录
    #[arg(long, value_name = "DIR", default_value = "uploads/visual-search")]
    pub upload_dir: PathBuf,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        if self.upload_dir.is_absolute() {
            return Err(anyhow!("上传目录必须是相对于资源目录的路径"));
        }

        let catalog = catalog_builder(opts, &self.source).open().await?;
        info!(
            "商品总数: {}，缺少指纹: {}",
            catalog.count_products().await?,
            catalog.count_unindexed().await?
        );

        let mut token = self.token.clone();
        if token.is_empty() {
            token = Alphanumeric.sample_string(&mut rand::rng(), 32);
            info!("鉴权 token: {}", token);
        }

        // 创建应用状态
        let state = server::AppState::new(catalog, self.search, self.upload_dir.clone(), token);

        // 创建应用
        let app = server::create_app(state);

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
