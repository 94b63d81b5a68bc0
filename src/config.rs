use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs =
        ProjectDirs::from("", "lookalike", "lookalike").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap_or(".")
}

#[derive(Parser, Debug, Clone)]
pub struct SourceOptions {
    /// 本地图片资源根目录，默认为配置目录下的 assets
    #[arg(long, value_name = "DIR")]
    pub asset_root: Option<PathBuf>,
    /// 读取单张图片的超时时间，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = 10., value_parser = parse_timeout)]
    pub fetch_timeout: f32,
}

impl SourceOptions {
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f32(self.fetch_timeout.max(0.001)).unwrap_or(MAX_FETCH_TIMEOUT)
    }
}

/// 单张图片的超时上限
const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(3600);

fn parse_timeout(s: &str) -> Result<f32, String> {
    let secs: f32 = s.parse().map_err(|e| format!("{e}"))?;
    match Duration::try_from_secs_f32(secs) {
        Ok(d) if !d.is_zero() && d <= MAX_FETCH_TIMEOUT => Ok(secs),
        _ => Err(format!("超时时间必须大于 0 且不超过 {} 秒", MAX_FETCH_TIMEOUT.as_secs())),
    }
}

#[derive(Parser, Debug, Clone, Copy)]
pub struct SearchOptions {
    /// 返回的结果数量
    #[arg(short = 'k', long, value_name = "K", default_value_t = 12)]
    pub count: usize,
    /// 每次搜索前最多补算多少个商品的指纹，0 表示不补算
    #[arg(long, value_name = "N", default_value_t = 60)]
    pub backfill_batch: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { count: 12, backfill_batch: 60 }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "lookalike", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// lookalike 配置文件目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 从 JSON 文件导入商品
    Import(ImportCommand),
    /// 计算单张图片的指纹
    Hash(HashCommand),
    /// 搜索外观相似的商品
    Search(SearchCommand),
    /// 为所有缺少指纹的商品计算指纹
    Reindex(ReindexCommand),
    /// 启动 HTTP 搜索服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("lookalike.db")
    }

    /// 返回默认的本地资源目录
    pub fn assets(&self) -> PathBuf {
        self.path.join("assets")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Opts::try_parse_from(["lookalike", "-c", "/tmp/x", "reindex"]).unwrap();
        assert_eq!(opts.conf_dir.database(), PathBuf::from("/tmp/x/lookalike.db"));
        assert_eq!(opts.conf_dir.assets(), PathBuf::from("/tmp/x/assets"));
        let SubCommand::Reindex(cmd) = opts.subcmd else { panic!("wrong subcommand") };
        assert_eq!(cmd.source.timeout(), Duration::from_secs(10));
        assert!(cmd.source.asset_root.is_none());
    }

    #[test]
    fn test_fetch_timeout() {
        let parse = |v: &str| Opts::try_parse_from(["lookalike", "reindex", "--fetch-timeout", v]);
        let SubCommand::Reindex(cmd) = parse("0.5").unwrap().subcmd else {
            panic!("wrong subcommand")
        };
        assert_eq!(cmd.source.timeout(), Duration::from_millis(500));

        for v in ["inf", "NaN", "-1", "0", "1e30", "abc"] {
            assert!(parse(v).is_err(), "{v}");
        }

        let source = SourceOptions { asset_root: None, fetch_timeout: f32::INFINITY };
        assert_eq!(source.timeout(), MAX_FETCH_TIMEOUT);
    }

    #[test]
    fn test_search_options() {
        let opts =
            Opts::try_parse_from(["lookalike", "search", "a.jpg", "--count", "3"]).unwrap();
        let SubCommand::Search(cmd) = opts.subcmd else { panic!("wrong subcommand") };
        assert_eq!(cmd.search.count, 3);
        assert_eq!(cmd.search.backfill_batch, 60);
    }
}
