// ==========================================
// 工厂流水线规划系统 - 配方目录层
// ==========================================
// 职责: 按名称/分类/生产实体/产出/消耗检索配方记录
// 说明: 核心通过 trait 消费目录,存储实现可替换
// ==========================================

pub mod error;
pub mod memory;
pub mod sqlite;

pub use error::{CatalogError, CatalogResult};
pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;

use crate::domain::recipe::Recipe;

/// 配方目录检索接口
///
/// 空结果一律以 `NotFound` 失败;按名检索要求唯一,
/// 多条同名记录以 `Ambiguous` 失败。
pub trait RecipeCatalog {
    /// 按名称检索(要求唯一)
    fn find_by_name(&self, name: &str) -> CatalogResult<Recipe>;

    /// 按分类检索
    fn find_by_category(&self, category: &str) -> CatalogResult<Vec<Recipe>>;

    /// 按生产实体类型检索
    fn find_by_entity(&self, producing_entity: &str) -> CatalogResult<Vec<Recipe>>;

    /// 按产出资源检索
    fn find_by_output(&self, resource: &str) -> CatalogResult<Vec<Recipe>>;

    /// 按消耗资源检索
    fn find_by_input(&self, resource: &str) -> CatalogResult<Vec<Recipe>>;
}

/// 列表检索的统一收尾: 空结果转为 NotFound
pub(crate) fn require_matches(key: &str, matches: Vec<Recipe>) -> CatalogResult<Vec<Recipe>> {
    if matches.is_empty() {
        return Err(CatalogError::NotFound {
            key: key.to_string(),
        });
    }
    Ok(matches)
}

/// 按名检索的统一收尾: 空转 NotFound,多条转 Ambiguous
pub(crate) fn require_unique(key: &str, mut matches: Vec<Recipe>) -> CatalogResult<Recipe> {
    match matches.len() {
        0 => Err(CatalogError::NotFound {
            key: key.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(CatalogError::Ambiguous {
            key: key.to_string(),
            matches: matches.into_iter().map(|r| r.name).collect(),
        }),
    }
}
