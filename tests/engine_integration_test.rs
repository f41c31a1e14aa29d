// ==========================================
// 引擎集成测试
// ==========================================
// 测试范围:
// 1. 需求变更的全链同步传播(需求 -> 单元 -> 块 -> 线)
// 2. 多块生产线的净算与平衡
// 3. dispose 后的订阅泄漏防护
// 4. 重算幂等性
// ==========================================

use factory_planner::{
    Demand, FlowError, ProductionLine, ProductionUnit, Recipe, ResourceQuantity,
};
use std::cell::Cell;
use std::rc::Rc;

// ==========================================
// 辅助函数
// ==========================================

fn recipe(name: &str, inputs: &[(&str, f64)], outputs: &[(&str, f64)]) -> Recipe {
    Recipe {
        name: name.to_string(),
        category: "Test".to_string(),
        producing_entity: "Assembler".to_string(),
        inputs: inputs
            .iter()
            .map(|(r, v)| ResourceQuantity::new(*r, *v).expect("流量非法"))
            .collect(),
        outputs: outputs
            .iter()
            .map(|(r, v)| ResourceQuantity::new(*r, *v).expect("流量非法"))
            .collect(),
    }
}

fn unit(r: Recipe, target: &str, rate: f64) -> ProductionUnit {
    let demand = Demand::single(target, rate).expect("需求流量非法");
    ProductionUnit::with_default_policy(r, demand).expect("创建单元失败")
}

fn rate_of(quantities: &[ResourceQuantity], resource: &str) -> Option<f64> {
    quantities
        .iter()
        .find(|q| q.resource == resource)
        .map(|q| q.rate_per_minute)
}

// ==========================================
// 全链传播
// ==========================================

#[test]
fn test_demand_change_settles_whole_chain() {
    // 铁棒块: 主单元铁棒 + 副单元铁板(满足铁板缺口)
    let line = ProductionLine::new();
    let rod_demand = Demand::single("IronRod", 30.0).unwrap();
    let rod = recipe("IronRod", &[("IronPlate", 10.0)], &[("IronRod", 15.0)]);
    let main = ProductionUnit::with_default_policy(rod, rod_demand.clone()).unwrap();
    let block = line.add_unit(main);

    let plate = recipe("IronPlate", &[("IronOre", 30.0)], &[("IronPlate", 20.0)]);
    let plate_demand = block.inputs()[0].clone();
    let secondary = ProductionUnit::with_default_policy(plate, plate_demand).unwrap();
    block.add_unit(secondary.clone());

    // 初始: 30 棒 -> 2 台 -> 20 板 -> 1 台 -> 30 矿
    assert_eq!(rate_of(&line.inputs(), "IronOre"), Some(30.0));
    assert_eq!(rate_of(&line.outputs(), "IronRod"), Some(30.0));

    // 根需求翻倍,set_rate 返回时整链已收敛
    rod_demand.set_rate(60.0).unwrap();
    assert_eq!(secondary.entity_count(), 2.0);
    assert_eq!(rate_of(&line.inputs(), "IronOre"), Some(60.0));
    assert_eq!(rate_of(&line.outputs(), "IronRod"), Some(60.0));

    // 归零
    rod_demand.set_rate(0.0).unwrap();
    assert_eq!(secondary.entity_count(), 0.0);
    assert!(line.inputs().is_empty());
    assert!(line.outputs().is_empty());
}

#[test]
fn test_line_notifies_on_leaf_change() {
    let line = ProductionLine::new();
    let demand = Demand::single("Iron", 10.0).unwrap();
    let producer = recipe("IronSource", &[], &[("Iron", 10.0)]);
    let u = ProductionUnit::with_default_policy(producer, demand.clone()).unwrap();
    line.add_unit(u);

    let notified = Rc::new(Cell::new(0u32));
    let notified_clone = Rc::clone(&notified);
    line.subscribe(Rc::new(move || {
        notified_clone.set(notified_clone.get() + 1);
    }));

    demand.set_rate(20.0).unwrap();
    assert!(notified.get() > 0);
    assert_eq!(rate_of(&line.outputs(), "Iron"), Some(20.0));
}

// ==========================================
// 多块净算
// ==========================================

#[test]
fn test_cross_block_netting_surplus() {
    // 块 A 产出 Iron 60,块 B 消耗 Iron 40 -> 线输出 Iron 20
    let line = ProductionLine::new();
    line.add_unit(unit(recipe("IronSource", &[], &[("Iron", 60.0)]), "Iron", 60.0));
    line.add_unit(unit(
        recipe("Gear", &[("Iron", 40.0)], &[("Gear", 10.0)]),
        "Gear",
        10.0,
    ));

    assert_eq!(rate_of(&line.outputs(), "Iron"), Some(20.0));
    assert_eq!(rate_of(&line.outputs(), "Gear"), Some(10.0));
    assert!(line.inputs().is_empty());
}

#[test]
fn test_cross_block_netting_reacts_to_change() {
    let line = ProductionLine::new();
    let iron_demand = Demand::single("Iron", 60.0).unwrap();
    let producer = recipe("IronSource", &[], &[("Iron", 60.0)]);
    let producer_unit =
        ProductionUnit::with_default_policy(producer, iron_demand.clone()).unwrap();
    line.add_unit(producer_unit);
    line.add_unit(unit(
        recipe("Gear", &[("Iron", 40.0)], &[("Gear", 10.0)]),
        "Gear",
        10.0,
    ));

    // 产量降到 25: 盈余变缺口
    iron_demand.set_rate(25.0).unwrap();
    assert_eq!(rate_of(&line.outputs(), "Iron"), None);
    assert_eq!(rate_of(&line.inputs(), "Iron"), Some(15.0));

    // 产量恰好 40: 双双消去
    iron_demand.set_rate(40.0).unwrap();
    assert_eq!(rate_of(&line.outputs(), "Iron"), None);
    assert_eq!(rate_of(&line.inputs(), "Iron"), None);
}

#[test]
fn test_no_duplicate_resources_at_any_level() {
    let line = ProductionLine::new();
    line.add_unit(unit(
        recipe("GearA", &[("Iron", 30.0), ("Copper", 10.0)], &[("GearA", 1.0)]),
        "GearA",
        1.0,
    ));
    line.add_unit(unit(
        recipe("GearB", &[("Iron", 50.0), ("Copper", 5.0)], &[("GearB", 1.0)]),
        "GearB",
        1.0,
    ));

    for block in line.blocks() {
        let inputs = block.input_quantities();
        for q in &inputs {
            assert_eq!(inputs.iter().filter(|o| o.resource == q.resource).count(), 1);
        }
    }
    let inputs = line.inputs();
    for q in &inputs {
        assert_eq!(inputs.iter().filter(|o| o.resource == q.resource).count(), 1);
    }
    assert_eq!(rate_of(&inputs, "Iron"), Some(80.0));
    assert_eq!(rate_of(&inputs, "Copper"), Some(15.0));
}

#[test]
fn test_epsilon_residue_dropped() {
    let line = ProductionLine::new();
    line.add_unit(unit(
        recipe("WaterSource", &[], &[("Water", 10.0003)]),
        "Water",
        10.0003,
    ));
    line.add_unit(unit(
        recipe("Boiler", &[("Water", 10.0)], &[("Steam", 10.0)]),
        "Steam",
        10.0,
    ));

    // 残余 0.0003 < 0.001 -> 不出现在对外输出中
    assert_eq!(rate_of(&line.outputs(), "Water"), None);
    assert!(line.inputs().is_empty());
}

// ==========================================
// dispose 与订阅泄漏
// ==========================================

#[test]
fn test_removed_unit_is_fully_detached() {
    let line = ProductionLine::new();
    let rod_demand = Demand::single("IronRod", 30.0).unwrap();
    let rod = recipe("IronRod", &[("IronPlate", 10.0)], &[("IronRod", 15.0)]);
    let main = ProductionUnit::with_default_policy(rod, rod_demand.clone()).unwrap();
    let block = line.add_unit(main);

    let plate = recipe("IronPlate", &[("IronOre", 30.0)], &[("IronPlate", 20.0)]);
    let plate_demand = block.inputs()[0].clone();
    let secondary = ProductionUnit::with_default_policy(plate, plate_demand.clone()).unwrap();
    block.add_unit(secondary.clone());
    assert_eq!(rate_of(&line.inputs(), "IronOre"), Some(30.0));

    block.remove_unit(&secondary).unwrap();
    assert!(secondary.is_disposed());
    // 输入需求已清零,块/线回到未满足铁板缺口的状态
    assert_eq!(rate_of(&line.inputs(), "IronOre"), None);
    assert_eq!(rate_of(&line.inputs(), "IronPlate"), Some(20.0));

    // 孤儿生产需求仍可变化: 不 panic,且下游不再有可观察的重算
    let inputs_before = line.inputs();
    plate_demand.set_rate(999.0).unwrap();
    assert_eq!(secondary.entity_count(), 0.0);
    assert_eq!(secondary.inputs()[0].rate_per_minute(), 0.0);
    // 块输入只跟随主单元,与孤儿需求的后续变化无关
    rod_demand.set_rate(30.0).unwrap();
    assert_eq!(line.inputs(), inputs_before);
}

#[test]
fn test_remove_main_unit_always_fails() {
    let line = ProductionLine::new();
    let rod = recipe("IronRod", &[("IronPlate", 10.0)], &[("IronRod", 15.0)]);
    let main = unit(rod, "IronRod", 30.0);
    let block = line.add_unit(main.clone());

    assert!(matches!(
        block.remove_unit(&main),
        Err(FlowError::InvalidOperation(_))
    ));
}

// ==========================================
// 幂等性
// ==========================================

#[test]
fn test_recompute_idempotent_across_levels() {
    let line = ProductionLine::new();
    line.add_unit(unit(recipe("IronSource", &[], &[("Iron", 60.0)]), "Iron", 60.0));
    let block = line.add_unit(unit(
        recipe("Gear", &[("Iron", 40.0)], &[("Gear", 10.0)]),
        "Gear",
        10.0,
    ));

    let block_inputs = block.input_quantities();
    let block_outputs = block.outputs();
    let line_inputs = line.inputs();
    let line_outputs = line.outputs();

    block.refresh();
    block.refresh();
    line.refresh();
    line.refresh();

    assert_eq!(block.input_quantities(), block_inputs);
    assert_eq!(block.outputs(), block_outputs);
    assert_eq!(line.inputs(), line_inputs);
    assert_eq!(line.outputs(), line_outputs);
}
