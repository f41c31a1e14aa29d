// ==========================================
// 工厂流水线规划系统 - 命令行入口
// ==========================================
// 演示: 目录建表 -> 构建生产树 -> 打印全线净 IO
// ==========================================

use factory_planner::{
    i18n, logging, Demand, MemoryCatalog, ProductionLine, ProductionUnit, Recipe, RecipeCatalog,
    ResourceQuantity,
};

fn demo_catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog.add(Recipe {
        name: "IronPlate".to_string(),
        category: "Smelting".to_string(),
        producing_entity: "Smelter".to_string(),
        inputs: vec![ResourceQuantity::new("IronOre", 30.0).expect("配方流量非法")],
        outputs: vec![ResourceQuantity::new("IronPlate", 20.0).expect("配方流量非法")],
    });
    catalog.add(Recipe {
        name: "IronRod".to_string(),
        category: "Milling".to_string(),
        producing_entity: "Assembler".to_string(),
        inputs: vec![ResourceQuantity::new("IronPlate", 10.0).expect("配方流量非法")],
        outputs: vec![ResourceQuantity::new("IronRod", 15.0).expect("配方流量非法")],
    });
    catalog
}

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", factory_planner::APP_NAME);
    tracing::info!("系统版本: {}", factory_planner::VERSION);
    tracing::info!("==================================================");

    let catalog = demo_catalog();

    // 目标: 每分钟 30 根铁棒
    let line = ProductionLine::new();
    let rod_recipe = catalog.find_by_name("IronRod")?;
    let rod_demand = Demand::single("IronRod", 30.0)?;
    let main_unit = ProductionUnit::with_default_policy(rod_recipe, rod_demand)?;
    let block = line.add_unit(main_unit);

    // 用铁板配方满足块的铁板缺口
    let plate_recipe = catalog.find_by_name("IronPlate")?;
    let plate_demand = block.inputs()[0].clone();
    let plate_unit = ProductionUnit::with_default_policy(plate_recipe, plate_demand)?;
    block.add_unit(plate_unit);

    tracing::info!("生产线净输入:");
    for q in line.inputs() {
        tracing::info!(
            "  {} {:.2}/min",
            i18n::resource_display_name(&q.resource),
            q.rate_per_minute
        );
    }
    tracing::info!("生产线净输出:");
    for q in line.outputs() {
        tracing::info!(
            "  {} {:.2}/min",
            i18n::resource_display_name(&q.resource),
            q.rate_per_minute
        );
    }

    Ok(())
}
