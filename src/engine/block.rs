// ==========================================
// 工厂流水线规划系统 - 生产块
// ==========================================
// 职责: 主单元 + 若干副单元的聚合,
//       推导块级未满足输入与净输出,重算后发布 "IO 变更"
// 红线: 主单元(下标 0)永不可移除
// ==========================================

use crate::domain::demand::{Demand, SubscriberList, SubscriptionId};
use crate::domain::error::{FlowError, FlowResult};
use crate::domain::quantity::ResourceQuantity;
use crate::engine::unit::ProductionUnit;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::warn;

/// 同资源数量合并: 顺序稳定的单遍扫描,首现位置保留
pub(crate) fn merge_quantities(quantities: Vec<ResourceQuantity>) -> Vec<ResourceQuantity> {
    let mut merged: Vec<ResourceQuantity> = Vec::with_capacity(quantities.len());
    for q in quantities {
        match merged.iter_mut().find(|m| m.resource == q.resource) {
            Some(existing) => existing.rate_per_minute += q.rate_per_minute,
            None => merged.push(q),
        }
    }
    merged
}

// ==========================================
// ProductionBlock - 生产块
// ==========================================

struct BlockInner {
    /// 有序单元列表,下标 0 为主单元
    units: RefCell<Vec<ProductionUnit>>,
    /// 与 units 一一对应: 块对该单元需求(生产需求 + 各输入)的订阅
    unit_subscriptions: RefCell<Vec<Vec<(Demand, SubscriptionId)>>>,
    /// 合并后的未满足输入(同资源已聚合为 CombinedDemand)
    inputs: RefCell<Vec<Demand>>,
    /// 合并后的净输出
    outputs: RefCell<Vec<ResourceQuantity>>,
    subscribers: SubscriberList,
}

impl BlockInner {
    /// 重算块级 IO,最后发布 "IO 变更"
    ///
    /// 1. 收集所有单元的未满足输入需求
    /// 2. 同资源合并(合并即新建 CombinedDemand,旧聚合被释放)
    /// 3. 输出 = 主单元全部输出 + 各副单元除首项外的输出
    /// 4. 同资源输出合并
    fn recompute(&self) {
        let units: Vec<ProductionUnit> = self.units.borrow().clone();

        // 步骤 1: 未满足输入
        let mut merged_inputs: Vec<Demand> = Vec::new();
        for unit in &units {
            for demand in unit.inputs() {
                if demand.satisfied() {
                    continue;
                }
                // 步骤 2: 顺序稳定合并
                match merged_inputs
                    .iter()
                    .position(|m| m.resource() == demand.resource())
                {
                    Some(pos) => {
                        let existing = merged_inputs[pos].clone();
                        match existing.combine(demand) {
                            Ok(combined) => {
                                // 被替换的中间聚合立即释放源订阅
                                existing.release();
                                merged_inputs[pos] = combined;
                            }
                            Err(e) => {
                                // 同资源下不可达
                                warn!(error = %e, "合并块输入失败");
                            }
                        }
                    }
                    None => merged_inputs.push(demand.clone()),
                }
            }
        }

        // 步骤 3/4: 净输出
        let mut outputs: Vec<ResourceQuantity> = Vec::new();
        if let Some((main, rest)) = units.split_first() {
            outputs.extend(main.outputs());
            for unit in rest {
                let unit_outputs = unit.outputs();
                if unit_outputs.len() > 1 {
                    // 副单元的首项输出即其被添加来满足的生产需求,
                    // 已通过 satisfied 标记反映,不再计入
                    outputs.extend(unit_outputs.into_iter().skip(1));
                }
            }
        }
        let outputs = merge_quantities(outputs);

        // 换入新快照后,释放未被任何单元收养的旧聚合需求
        let stale = std::mem::replace(&mut *self.inputs.borrow_mut(), merged_inputs);
        for old in stale {
            if old.is_combined() && !self.is_adopted(&old) {
                old.release();
            }
        }
        *self.outputs.borrow_mut() = outputs;

        // 步骤 5: 发布 "IO 变更"
        self.subscribers.notify();
    }

    /// 该需求是否已成为某单元的生产需求(所有权已移交该单元)
    fn is_adopted(&self, demand: &Demand) -> bool {
        self.units
            .borrow()
            .iter()
            .any(|u| u.production_demand().ptr_eq(demand))
    }
}

/// 生产块句柄(`Rc` 共享,clone 得到同一块)
#[derive(Clone)]
pub struct ProductionBlock {
    inner: Rc<BlockInner>,
}

impl ProductionBlock {
    /// 以主单元创建生产块
    ///
    /// 块不存在"空"状态: 没有初始主单元就没有块。
    pub fn new(main_unit: ProductionUnit) -> ProductionBlock {
        let block = ProductionBlock {
            inner: Rc::new(BlockInner {
                units: RefCell::new(Vec::new()),
                unit_subscriptions: RefCell::new(Vec::new()),
                inputs: RefCell::new(Vec::new()),
                outputs: RefCell::new(Vec::new()),
                subscribers: SubscriberList::new(),
            }),
        };
        block.attach(main_unit);
        block.inner.recompute();
        block
    }

    /// 接入单元: 订阅其生产需求与全部输入需求的"变更",
    /// 任一变更触发块重算并再发布 "IO 变更"
    fn attach(&self, unit: ProductionUnit) {
        let mut subscriptions = Vec::with_capacity(unit.inputs().len() + 1);
        let mut watched: Vec<Demand> = vec![unit.production_demand()];
        watched.extend(unit.inputs().iter().cloned());

        for demand in watched {
            let weak: Weak<BlockInner> = Rc::downgrade(&self.inner);
            let id = demand.subscribe(Rc::new(move || {
                if let Some(block) = weak.upgrade() {
                    block.recompute();
                }
            }));
            subscriptions.push((demand, id));
        }

        self.inner.units.borrow_mut().push(unit);
        self.inner.unit_subscriptions.borrow_mut().push(subscriptions);
    }

    /// 添加副单元: 其生产需求被标记为已满足
    /// (递归下发到聚合源),随后重算
    pub fn add_unit(&self, unit: ProductionUnit) {
        unit.production_demand().set_satisfied(true);
        self.attach(unit);
        self.inner.recompute();
    }

    /// 移除副单元: 还原 satisfied 标记、退订、dispose、重算
    ///
    /// # 错误
    /// - `InvalidOperation`: 单元不在块中,或为主单元
    pub fn remove_unit(&self, unit: &ProductionUnit) -> FlowResult<()> {
        let pos = {
            let units = self.inner.units.borrow();
            units.iter().position(|u| u.same_unit(unit))
        };
        let pos = pos.ok_or_else(|| {
            FlowError::invalid_operation(format!(
                "单元不在该生产块中: {}",
                unit.recipe().name
            ))
        })?;
        if pos == 0 {
            return Err(FlowError::invalid_operation(format!(
                "主单元不可移除: {}",
                unit.recipe().name
            )));
        }

        unit.production_demand().set_satisfied(false);

        let removed = self.inner.units.borrow_mut().remove(pos);
        let subscriptions = self.inner.unit_subscriptions.borrow_mut().remove(pos);
        for (demand, id) in subscriptions {
            demand.unsubscribe(id);
        }

        removed.dispose();
        self.inner.recompute();
        Ok(())
    }

    /// 主单元
    pub fn main_unit(&self) -> ProductionUnit {
        // 构造保证至少有主单元
        self.inner.units.borrow()[0].clone()
    }

    /// 单元列表快照
    pub fn units(&self) -> Vec<ProductionUnit> {
        self.inner.units.borrow().clone()
    }

    /// 未满足输入列表快照(同资源已聚合)
    pub fn inputs(&self) -> Vec<Demand> {
        self.inner.inputs.borrow().clone()
    }

    /// 未满足输入的数量视图
    pub fn input_quantities(&self) -> Vec<ResourceQuantity> {
        self.inner
            .inputs
            .borrow()
            .iter()
            .map(|d| d.to_quantity())
            .collect()
    }

    /// 净输出列表快照
    pub fn outputs(&self) -> Vec<ResourceQuantity> {
        self.inner.outputs.borrow().clone()
    }

    /// 订阅块 "IO 变更" 通知
    pub fn subscribe(&self, handler: crate::domain::demand::ChangeHandler) -> SubscriptionId {
        self.inner.subscribers.subscribe(handler)
    }

    /// 退订
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    /// 手动触发重算(幂等: 无中间变更时结果不变)
    pub fn refresh(&self) {
        self.inner.recompute();
    }

    /// 是否为同一底层块
    pub fn same_block(&self, other: &ProductionBlock) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ProductionBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionBlock")
            .field("units", &self.inner.units.borrow().len())
            .field("inputs", &self.input_quantities())
            .field("outputs", &self.inner.outputs.borrow())
            .finish()
    }
}
