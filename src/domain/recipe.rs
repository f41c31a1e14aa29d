// ==========================================
// 工厂流水线规划系统 - 配方实体
// ==========================================
// 职责: 单台生产实体额定产出下的输入/输出流量映射
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

use crate::domain::quantity::ResourceQuantity;
use serde::{Deserialize, Serialize};

/// 配方
///
/// 输入/输出流量均按"一台生产实体在额定产出下"给出,
/// 引擎按 entity_count 成比例缩放。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// 配方名称(目录内唯一键)
    pub name: String,
    /// 配方分类(目录检索用)
    pub category: String,
    /// 生产实体类型(如 "Smelter" / "Refinery")
    pub producing_entity: String,
    /// 输入流量列表(有序)
    pub inputs: Vec<ResourceQuantity>,
    /// 输出流量列表(有序,约定第一项为主产物)
    pub outputs: Vec<ResourceQuantity>,
}

impl Recipe {
    /// 主产物(输出列表第一项)
    pub fn primary_output(&self) -> Option<&ResourceQuantity> {
        self.outputs.first()
    }

    /// 是否产出指定资源
    pub fn produces(&self, resource: &str) -> bool {
        self.outputs.iter().any(|q| q.resource == resource)
    }

    /// 是否消耗指定资源
    pub fn consumes(&self, resource: &str) -> bool {
        self.inputs.iter().any(|q| q.resource == resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iron_plate_recipe() -> Recipe {
        Recipe {
            name: "IronPlate".to_string(),
            category: "Smelting".to_string(),
            producing_entity: "Smelter".to_string(),
            inputs: vec![ResourceQuantity::new("IronOre", 30.0).unwrap()],
            outputs: vec![ResourceQuantity::new("IronPlate", 20.0).unwrap()],
        }
    }

    #[test]
    fn test_primary_output() {
        let r = iron_plate_recipe();
        assert_eq!(r.primary_output().unwrap().resource, "IronPlate");
    }

    #[test]
    fn test_produces_consumes() {
        let r = iron_plate_recipe();
        assert!(r.produces("IronPlate"));
        assert!(!r.produces("IronOre"));
        assert!(r.consumes("IronOre"));
        assert!(!r.consumes("IronPlate"));
    }
}
