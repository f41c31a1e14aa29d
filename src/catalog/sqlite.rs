// ==========================================
// 工厂流水线规划系统 - SQLite 配方目录
// ==========================================
// 职责: recipe 表的读写与检索
// 红线: Catalog 不含业务逻辑
// 存储: 输入/输出列表存 JSON 列(inputs_json / outputs_json)
// ==========================================

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::{require_matches, require_unique, RecipeCatalog};
use crate::domain::quantity::ResourceQuantity;
use crate::domain::recipe::Recipe;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SqliteCatalog - SQLite 配方目录
// ==========================================
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    /// 从共享连接创建
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> CatalogResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| CatalogError::LockError(e.to_string()))
    }

    /// 初始化 recipe 表(允许同名记录,按名检索以 Ambiguous 暴露)
    pub fn init_schema(&self) -> CatalogResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS recipe (
                recipe_id        INTEGER PRIMARY KEY AUTOINCREMENT,
                name             TEXT NOT NULL,
                category         TEXT NOT NULL,
                producing_entity TEXT NOT NULL,
                inputs_json      TEXT NOT NULL,
                outputs_json     TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_recipe_name ON recipe(name);
            CREATE INDEX IF NOT EXISTS idx_recipe_category ON recipe(category);
            "#,
        )?;
        Ok(())
    }

    /// 写入配方
    pub fn insert(&self, recipe: &Recipe) -> CatalogResult<()> {
        let inputs_json = serde_json::to_string(&recipe.inputs)?;
        let outputs_json = serde_json::to_string(&recipe.outputs)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO recipe (name, category, producing_entity, inputs_json, outputs_json)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                recipe.name,
                recipe.category,
                recipe.producing_entity,
                inputs_json,
                outputs_json
            ],
        )?;
        Ok(())
    }

    /// 按 WHERE 子句查询配方列表
    fn query(&self, where_clause: &str, args: &[&dyn rusqlite::ToSql]) -> CatalogResult<Vec<Recipe>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT name, category, producing_entity, inputs_json, outputs_json
             FROM recipe WHERE {} ORDER BY recipe_id",
            where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut recipes = Vec::new();
        for row in rows {
            let (name, category, producing_entity, inputs_json, outputs_json) = row?;
            let inputs: Vec<ResourceQuantity> = serde_json::from_str(&inputs_json)?;
            let outputs: Vec<ResourceQuantity> = serde_json::from_str(&outputs_json)?;
            recipes.push(Recipe {
                name,
                category,
                producing_entity,
                inputs,
                outputs,
            });
        }
        Ok(recipes)
    }

    /// 全表查询(资源级检索在内存中过滤)
    fn query_all(&self) -> CatalogResult<Vec<Recipe>> {
        self.query("1 = 1", &[])
    }
}

impl RecipeCatalog for SqliteCatalog {
    fn find_by_name(&self, name: &str) -> CatalogResult<Recipe> {
        // 名称匹配不区分大小写(与内存目录一致)
        let matches = self.query("name = ?1 COLLATE NOCASE", &[&name])?;
        require_unique(name, matches)
    }

    fn find_by_category(&self, category: &str) -> CatalogResult<Vec<Recipe>> {
        require_matches(category, self.query("category = ?1", &[&category])?)
    }

    fn find_by_entity(&self, producing_entity: &str) -> CatalogResult<Vec<Recipe>> {
        require_matches(
            producing_entity,
            self.query("producing_entity = ?1", &[&producing_entity])?,
        )
    }

    fn find_by_output(&self, resource: &str) -> CatalogResult<Vec<Recipe>> {
        let matches = self
            .query_all()?
            .into_iter()
            .filter(|r| r.produces(resource))
            .collect();
        require_matches(resource, matches)
    }

    fn find_by_input(&self, resource: &str) -> CatalogResult<Vec<Recipe>> {
        let matches = self
            .query_all()?
            .into_iter()
            .filter(|r| r.consumes(resource))
            .collect();
        require_matches(resource, matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_sqlite_connection;

    fn setup() -> SqliteCatalog {
        let conn = open_sqlite_connection(":memory:").expect("打开内存数据库失败");
        let catalog = SqliteCatalog::new(Arc::new(Mutex::new(conn)));
        catalog.init_schema().expect("初始化 recipe 表失败");

        catalog
            .insert(&Recipe {
                name: "IronPlate".to_string(),
                category: "Smelting".to_string(),
                producing_entity: "Smelter".to_string(),
                inputs: vec![ResourceQuantity::new("IronOre", 30.0).unwrap()],
                outputs: vec![ResourceQuantity::new("IronPlate", 20.0).unwrap()],
            })
            .unwrap();
        catalog
            .insert(&Recipe {
                name: "Fuel".to_string(),
                category: "Refining".to_string(),
                producing_entity: "Refinery".to_string(),
                inputs: vec![ResourceQuantity::new("CrudeOil", 60.0).unwrap()],
                outputs: vec![
                    ResourceQuantity::new("Fuel", 40.0).unwrap(),
                    ResourceQuantity::new("Resin", 30.0).unwrap(),
                ],
            })
            .unwrap();
        catalog
    }

    #[test]
    fn test_roundtrip_by_name() {
        let catalog = setup();
        let r = catalog.find_by_name("IronPlate").unwrap();
        assert_eq!(r.inputs[0].resource, "IronOre");
        assert_eq!(r.outputs[0].rate_per_minute, 20.0);
    }

    #[test]
    fn test_not_found_and_ambiguous() {
        let catalog = setup();
        assert!(matches!(
            catalog.find_by_name("Missing"),
            Err(CatalogError::NotFound { .. })
        ));

        catalog
            .insert(&Recipe {
                name: "ironplate".to_string(),
                category: "Alt".to_string(),
                producing_entity: "Foundry".to_string(),
                inputs: vec![],
                outputs: vec![ResourceQuantity::new("IronPlate", 10.0).unwrap()],
            })
            .unwrap();
        assert!(matches!(
            catalog.find_by_name("IronPlate"),
            Err(CatalogError::Ambiguous { .. })
        ));
    }

    #[test]
    fn test_find_by_io() {
        let catalog = setup();
        let by_output = catalog.find_by_output("Resin").unwrap();
        assert_eq!(by_output.len(), 1);
        assert_eq!(by_output[0].name, "Fuel");

        let by_input = catalog.find_by_input("CrudeOil").unwrap();
        assert_eq!(by_input.len(), 1);
        assert!(matches!(
            catalog.find_by_input("Water"),
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[test]
    fn test_find_by_category_entity() {
        let catalog = setup();
        assert_eq!(catalog.find_by_category("Smelting").unwrap().len(), 1);
        assert_eq!(catalog.find_by_entity("Refinery").unwrap().len(), 1);
    }
}
