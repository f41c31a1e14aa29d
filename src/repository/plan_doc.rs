// ==========================================
// 工厂流水线规划系统 - 生产方案文档模型
// ==========================================
// 职责: ProductionLine 反应树 <-> serde 文档的双向转换
// 不变量: load -> save -> load 得到可观察等价的树
//         (结构、流量、satisfied 标记全部还原)
// ==========================================

use crate::domain::demand::Demand;
use crate::domain::recipe::Recipe;
use crate::engine::block::ProductionBlock;
use crate::engine::line::ProductionLine;
use crate::engine::unit::{PolicyRegistry, ProductionUnit};
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde::{Deserialize, Serialize};

// ==========================================
// 文档结构
// ==========================================

/// 生产线文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDoc {
    pub blocks: Vec<BlockDoc>,
}

/// 生产块文档(单元保序,下标 0 为主单元)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDoc {
    pub units: Vec<UnitDoc>,
}

/// 生产单元文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDoc {
    pub recipe: Recipe,
    /// 实体数量策略注册名
    pub policy: String,
    pub production_demand: DemandDoc,
    /// 各输入需求的 satisfied 标记,与 recipe.inputs 保序对应
    pub inputs_satisfied: Vec<bool>,
}

/// 需求文档
///
/// 树内的单一需求要么是某单元的输入(以块内坐标引用),
/// 要么是外部给定的独立需求(内联存储)。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DemandDoc {
    /// 外部独立需求
    External {
        resource: String,
        rate_per_minute: f64,
        satisfied: bool,
    },
    /// 块内某单元的第 input 个输入需求
    InputRef { unit: usize, input: usize },
    /// 聚合需求
    Combined {
        satisfied: bool,
        sources: Vec<DemandDoc>,
    },
}

// ==========================================
// 编码: 反应树 -> 文档
// ==========================================

/// 将生产线编码为文档
pub fn encode_line(line: &ProductionLine) -> LineDoc {
    LineDoc {
        blocks: line.blocks().iter().map(encode_block).collect(),
    }
}

fn encode_block(block: &ProductionBlock) -> BlockDoc {
    let units = block.units();
    BlockDoc {
        units: units
            .iter()
            .enumerate()
            .map(|(idx, unit)| encode_unit(unit, &units[..idx]))
            .collect(),
    }
}

fn encode_unit(unit: &ProductionUnit, prior_units: &[ProductionUnit]) -> UnitDoc {
    UnitDoc {
        recipe: unit.recipe().clone(),
        policy: unit.policy_name().to_string(),
        production_demand: encode_demand(&unit.production_demand(), prior_units),
        inputs_satisfied: unit.inputs().iter().map(|d| d.satisfied()).collect(),
    }
}

/// 单一需求优先按块内坐标引用,不可达时内联为外部需求
fn encode_demand(demand: &Demand, prior_units: &[ProductionUnit]) -> DemandDoc {
    match demand {
        Demand::Single(_) => {
            for (unit_idx, unit) in prior_units.iter().enumerate() {
                for (input_idx, input) in unit.inputs().iter().enumerate() {
                    if input.ptr_eq(demand) {
                        return DemandDoc::InputRef {
                            unit: unit_idx,
                            input: input_idx,
                        };
                    }
                }
            }
            DemandDoc::External {
                resource: demand.resource().to_string(),
                rate_per_minute: demand.rate_per_minute(),
                satisfied: demand.satisfied(),
            }
        }
        Demand::Combined(_) => DemandDoc::Combined {
            satisfied: demand.satisfied(),
            sources: demand
                .sources()
                .iter()
                .map(|src| encode_demand(src, prior_units))
                .collect(),
        },
    }
}

// ==========================================
// 解码: 文档 -> 反应树
// ==========================================

/// 从文档重建完整接线的生产线
pub fn decode_line(
    doc: &LineDoc,
    registry: &PolicyRegistry,
    balance_epsilon: f64,
) -> RepositoryResult<ProductionLine> {
    let line = ProductionLine::with_epsilon(balance_epsilon);
    for block_doc in &doc.blocks {
        let block = decode_block(block_doc, registry)?;
        line.add_block(block);
    }

    // 还原 satisfied 标记,分两遍:
    // 先按生产需求文档下发(聚合需求整体 + 各源单独还原),
    // 再按 inputs_satisfied 覆写每个输入需求(单一需求以此为准)。
    // satisfied 写入不触发通知,随后统一刷新。
    for (block, block_doc) in line.blocks().iter().zip(&doc.blocks) {
        for (unit, unit_doc) in block.units().iter().zip(&block_doc.units) {
            apply_satisfied(&unit_doc.production_demand, &unit.production_demand());
        }
    }
    for (block, block_doc) in line.blocks().iter().zip(&doc.blocks) {
        for (unit, unit_doc) in block.units().iter().zip(&block_doc.units) {
            for (input, flag) in unit.inputs().iter().zip(&unit_doc.inputs_satisfied) {
                input.set_satisfied(*flag);
            }
        }
        block.refresh();
    }
    line.refresh();
    Ok(line)
}

/// 按文档递归还原 satisfied 标记
///
/// 聚合需求的整体下发会覆写所有源,因此先整体、再逐源还原;
/// 输入引用以持有单元的 inputs_satisfied 为准,此处跳过。
fn apply_satisfied(doc: &DemandDoc, demand: &Demand) {
    match doc {
        DemandDoc::External { satisfied, .. } => demand.set_satisfied(*satisfied),
        DemandDoc::InputRef { .. } => {}
        DemandDoc::Combined { satisfied, sources } => {
            demand.set_satisfied(*satisfied);
            for (src_doc, src) in sources.iter().zip(demand.sources()) {
                apply_satisfied(src_doc, &src);
            }
        }
    }
}

fn decode_block(doc: &BlockDoc, registry: &PolicyRegistry) -> RepositoryResult<ProductionBlock> {
    let mut docs = doc.units.iter();
    let main_doc = docs.next().ok_or_else(|| {
        RepositoryError::ValidationError("生产块文档缺少主单元".to_string())
    })?;

    let mut built: Vec<ProductionUnit> = Vec::with_capacity(doc.units.len());
    let main = decode_unit(main_doc, &built, registry)?;
    let block = ProductionBlock::new(main.clone());
    built.push(main);

    for unit_doc in docs {
        let unit = decode_unit(unit_doc, &built, registry)?;
        block.add_unit(unit.clone());
        built.push(unit);
    }
    Ok(block)
}

fn decode_unit(
    doc: &UnitDoc,
    built: &[ProductionUnit],
    registry: &PolicyRegistry,
) -> RepositoryResult<ProductionUnit> {
    let policy = registry.get(&doc.policy).ok_or_else(|| {
        RepositoryError::ValidationError(format!("未注册的实体数量策略: {}", doc.policy))
    })?;
    let demand = decode_demand(&doc.production_demand, built)?;
    ProductionUnit::new(doc.recipe.clone(), demand, policy)
        .map_err(|e| RepositoryError::ValidationError(e.to_string()))
}

fn decode_demand(doc: &DemandDoc, built: &[ProductionUnit]) -> RepositoryResult<Demand> {
    match doc {
        DemandDoc::External {
            resource,
            rate_per_minute,
            ..
        } => Demand::single(resource.clone(), *rate_per_minute)
            .map_err(|e| RepositoryError::ValidationError(e.to_string())),
        DemandDoc::InputRef { unit, input } => {
            let owner = built.get(*unit).ok_or_else(|| {
                RepositoryError::ValidationError(format!("输入引用越界: unit={}", unit))
            })?;
            owner
                .inputs()
                .get(*input)
                .cloned()
                .ok_or_else(|| {
                    RepositoryError::ValidationError(format!(
                        "输入引用越界: unit={}, input={}",
                        unit, input
                    ))
                })
        }
        DemandDoc::Combined { sources, .. } => {
            let resolved = sources
                .iter()
                .map(|src| decode_demand(src, built))
                .collect::<RepositoryResult<Vec<Demand>>>()?;
            Demand::combined(resolved)
                .map_err(|e| RepositoryError::ValidationError(e.to_string()))
        }
    }
}
