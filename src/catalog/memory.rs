// ==========================================
// 工厂流水线规划系统 - 内存配方目录
// ==========================================
// 职责: 进程内配方表,测试与嵌入场景使用
// ==========================================

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::{require_matches, require_unique, RecipeCatalog};
use crate::domain::recipe::Recipe;

/// 内存配方目录
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    recipes: Vec<Recipe>,
}

impl MemoryCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 从配方列表创建
    pub fn with_recipes(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// 追加配方(允许同名,按名检索时以 Ambiguous 暴露)
    pub fn add(&mut self, recipe: Recipe) {
        self.recipes.push(recipe);
    }

    /// 配方总数
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    fn filter(&self, pred: impl Fn(&Recipe) -> bool) -> Vec<Recipe> {
        self.recipes.iter().filter(|r| pred(r)).cloned().collect()
    }
}

impl RecipeCatalog for MemoryCatalog {
    fn find_by_name(&self, name: &str) -> CatalogResult<Recipe> {
        // 名称匹配不区分大小写
        let matches = self.filter(|r| r.name.eq_ignore_ascii_case(name));
        require_unique(name, matches)
    }

    fn find_by_category(&self, category: &str) -> CatalogResult<Vec<Recipe>> {
        require_matches(category, self.filter(|r| r.category == category))
    }

    fn find_by_entity(&self, producing_entity: &str) -> CatalogResult<Vec<Recipe>> {
        require_matches(
            producing_entity,
            self.filter(|r| r.producing_entity == producing_entity),
        )
    }

    fn find_by_output(&self, resource: &str) -> CatalogResult<Vec<Recipe>> {
        require_matches(resource, self.filter(|r| r.produces(resource)))
    }

    fn find_by_input(&self, resource: &str) -> CatalogResult<Vec<Recipe>> {
        require_matches(resource, self.filter(|r| r.consumes(resource)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quantity::ResourceQuantity;

    fn catalog() -> MemoryCatalog {
        let mut c = MemoryCatalog::new();
        c.add(Recipe {
            name: "IronPlate".to_string(),
            category: "Smelting".to_string(),
            producing_entity: "Smelter".to_string(),
            inputs: vec![ResourceQuantity::new("IronOre", 30.0).unwrap()],
            outputs: vec![ResourceQuantity::new("IronPlate", 20.0).unwrap()],
        });
        c.add(Recipe {
            name: "CopperWire".to_string(),
            category: "Smelting".to_string(),
            producing_entity: "Smelter".to_string(),
            inputs: vec![ResourceQuantity::new("CopperOre", 30.0).unwrap()],
            outputs: vec![ResourceQuantity::new("CopperWire", 60.0).unwrap()],
        });
        c
    }

    #[test]
    fn test_find_by_name() {
        let c = catalog();
        let r = c.find_by_name("IronPlate").unwrap();
        assert_eq!(r.producing_entity, "Smelter");
        // 不区分大小写
        assert!(c.find_by_name("ironplate").is_ok());
    }

    #[test]
    fn test_not_found_vs_ambiguous() {
        let mut c = catalog();
        assert!(matches!(
            c.find_by_name("Missing"),
            Err(CatalogError::NotFound { .. })
        ));

        c.add(Recipe {
            name: "ironplate".to_string(),
            category: "Alt".to_string(),
            producing_entity: "Foundry".to_string(),
            inputs: vec![],
            outputs: vec![ResourceQuantity::new("IronPlate", 10.0).unwrap()],
        });
        assert!(matches!(
            c.find_by_name("IronPlate"),
            Err(CatalogError::Ambiguous { .. })
        ));
    }

    #[test]
    fn test_find_by_category_and_entity() {
        let c = catalog();
        assert_eq!(c.find_by_category("Smelting").unwrap().len(), 2);
        assert_eq!(c.find_by_entity("Smelter").unwrap().len(), 2);
        assert!(matches!(
            c.find_by_category("Refining"),
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[test]
    fn test_find_by_io_resource() {
        let c = catalog();
        let producing = c.find_by_output("IronPlate").unwrap();
        assert_eq!(producing.len(), 1);
        assert_eq!(producing[0].name, "IronPlate");

        let consuming = c.find_by_input("CopperOre").unwrap();
        assert_eq!(consuming.len(), 1);
        assert!(matches!(
            c.find_by_input("Uranium"),
            Err(CatalogError::NotFound { .. })
        ));
    }
}
