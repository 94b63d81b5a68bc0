use std::path::PathBuf;
use std::sync::Arc;

use crate::Catalog;
use crate::config::SearchOptions;

/// 应用状态
pub struct AppState {
    /// 商品目录
    pub catalog: Catalog,
    /// 搜索配置选项
    pub search: SearchOptions,
    /// 上传图片的保存目录，相对于资源目录
    pub upload_dir: PathBuf,
    /// 重建索引接口的鉴权 token
    pub token: String,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        catalog: Catalog,
        search: SearchOptions,
        upload_dir: PathBuf,
        token: String,
    ) -> Arc<Self> {
        Arc::new(AppState { catalog, search, upload_dir, token })
    }
}
