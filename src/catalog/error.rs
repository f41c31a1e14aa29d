// ==========================================
// 工厂流水线规划系统 - 配方目录错误类型
// ==========================================
// 职责: 区分"未找到"与"匹配不唯一"两类检索失败
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配方目录错误类型
#[derive(Error, Debug)]
pub enum CatalogError {
    // ===== 检索错误 =====
    #[error("配方未找到: {key}")]
    NotFound { key: String },

    #[error("配方匹配不唯一: {key}, 候选: {matches:?}")]
    Ambiguous { key: String, matches: Vec<String> },

    // ===== 数据访问错误 =====
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("配方记录损坏: {0}")]
    CorruptRecord(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogError::DatabaseQueryError(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::CorruptRecord(err.to_string())
    }
}

/// Result 类型别名
pub type CatalogResult<T> = Result<T, CatalogError>;
