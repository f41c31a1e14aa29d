// ==========================================
// 工厂流水线规划系统 - 生产单元
// ==========================================
// 职责: 将固定配方绑定到其某一产出的需求上,
//       按 entity_count 成比例推导输入需求与输出数量
// 红线: dispose 必须先退订再丢弃,否则订阅泄漏
// ==========================================

use crate::domain::demand::{Demand, SubscriptionId};
use crate::domain::error::{FlowError, FlowResult};
use crate::domain::quantity::ResourceQuantity;
use crate::domain::recipe::Recipe;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::warn;

// ==========================================
// EntityCountPolicy - 实体数量策略
// ==========================================

/// 实体数量推导策略
///
/// 引擎只约定"recompute 时必须由策略给出 entity_count",
/// 具体变体(超频、整数取整等)由嵌入方按配方/目标提供。
pub trait EntityCountPolicy {
    /// 策略注册名(持久化时按名恢复)
    fn name(&self) -> &str;

    /// 根据配方与目标需求推导实体数量
    fn entity_count(&self, recipe: &Recipe, target_resource: &str, demand_rate: f64) -> f64;
}

/// 默认策略: 需求流量 / 配方中目标产出的额定流量
pub struct ProportionalPolicy;

impl EntityCountPolicy for ProportionalPolicy {
    fn name(&self) -> &str {
        "proportional"
    }

    fn entity_count(&self, recipe: &Recipe, target_resource: &str, demand_rate: f64) -> f64 {
        let nominal = recipe
            .outputs
            .iter()
            .find(|q| q.resource == target_resource)
            .map(|q| q.rate_per_minute)
            .unwrap_or(0.0);
        if nominal <= 0.0 {
            return 0.0;
        }
        demand_rate / nominal
    }
}

// ==========================================
// PolicyRegistry - 策略注册表
// ==========================================

/// 按名注册的策略集合,持久化加载时用于恢复单元策略
pub struct PolicyRegistry {
    policies: HashMap<String, Rc<dyn EntityCountPolicy>>,
}

impl PolicyRegistry {
    /// 创建只含默认策略的注册表
    pub fn new() -> Self {
        let mut registry = Self {
            policies: HashMap::new(),
        };
        registry.register(Rc::new(ProportionalPolicy));
        registry
    }

    /// 注册策略(同名覆盖)
    pub fn register(&mut self, policy: Rc<dyn EntityCountPolicy>) {
        self.policies.insert(policy.name().to_string(), policy);
    }

    /// 按名查找
    pub fn get(&self, name: &str) -> Option<Rc<dyn EntityCountPolicy>> {
        self.policies.get(name).cloned()
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// ProductionUnit - 生产单元
// ==========================================

struct UnitInner {
    recipe: Recipe,
    production_demand: Demand,
    policy: Rc<dyn EntityCountPolicy>,
    entity_count: Cell<f64>,
    /// 与 recipe.inputs 一一对应,按 entity_count 缩放
    inputs: Vec<Demand>,
    /// 与 recipe.outputs 一一对应,普通值,变更不通知
    outputs: RefCell<Vec<ResourceQuantity>>,
    demand_subscription: Cell<Option<SubscriptionId>>,
    disposed: Cell<bool>,
}

impl UnitInner {
    /// 构造时与每次 productionDemand "变更"通知时调用
    ///
    /// 先替换输出(普通值,不通知),再推送输入需求;
    /// 输入级联触发的上游重算因此读到的输出已是新值。
    fn recompute(&self) {
        if self.disposed.get() {
            return;
        }

        let count = self.policy.entity_count(
            &self.recipe,
            self.production_demand.resource(),
            self.production_demand.rate_per_minute(),
        );
        let count = if count.is_nan() || count < 0.0 {
            warn!(
                recipe = %self.recipe.name,
                policy = %self.policy.name(),
                count,
                "策略给出非法实体数量,按 0 处理"
            );
            0.0
        } else {
            count
        };
        self.entity_count.set(count);

        let scaled: Vec<ResourceQuantity> = self
            .recipe
            .outputs
            .iter()
            .map(|q| ResourceQuantity {
                resource: q.resource.clone(),
                rate_per_minute: q.rate_per_minute * count,
            })
            .collect();
        *self.outputs.borrow_mut() = scaled;

        for (nominal, demand) in self.recipe.inputs.iter().zip(&self.inputs) {
            if let Err(e) = demand.set_rate(nominal.rate_per_minute * count) {
                // count 非负时不可达,保留日志以暴露策略缺陷
                warn!(recipe = %self.recipe.name, error = %e, "输入需求更新失败");
            }
        }
    }
}

/// 生产单元句柄(`Rc` 共享,clone 得到同一单元)
#[derive(Clone)]
pub struct ProductionUnit {
    inner: Rc<UnitInner>,
}

impl ProductionUnit {
    /// 创建生产单元并绑定生产需求
    ///
    /// 订阅需求"变更"通知直至 dispose;构造即执行一次 recompute。
    ///
    /// # 错误
    /// - `InvalidOperation`: 配方不产出需求的目标资源
    pub fn new(
        recipe: Recipe,
        production_demand: Demand,
        policy: Rc<dyn EntityCountPolicy>,
    ) -> FlowResult<ProductionUnit> {
        if !recipe.produces(production_demand.resource()) {
            return Err(FlowError::invalid_operation(format!(
                "配方 {} 不产出目标资源 {}",
                recipe.name,
                production_demand.resource()
            )));
        }

        let inputs: Vec<Demand> = recipe
            .inputs
            .iter()
            .map(|q| Demand::single_unchecked(q.resource.clone(), 0.0))
            .collect();

        let inner = Rc::new(UnitInner {
            recipe,
            production_demand,
            policy,
            entity_count: Cell::new(0.0),
            inputs,
            outputs: RefCell::new(Vec::new()),
            demand_subscription: Cell::new(None),
            disposed: Cell::new(false),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = inner.production_demand.subscribe(Rc::new(move || {
            if let Some(unit) = weak.upgrade() {
                unit.recompute();
            }
        }));
        inner.demand_subscription.set(Some(subscription));
        inner.recompute();

        Ok(ProductionUnit { inner })
    }

    /// 使用默认比例策略创建
    pub fn with_default_policy(recipe: Recipe, production_demand: Demand) -> FlowResult<Self> {
        Self::new(recipe, production_demand, Rc::new(ProportionalPolicy))
    }

    /// 终结单元: 退订生产需求、释放聚合需求的源订阅、
    /// 实体数与输出清零、将所有输入需求清零
    /// (下游聚合随之重算,排除本单元)。
    ///
    /// 幂等;丢弃单元前必须调用,否则订阅泄漏。
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.get() {
            return;
        }
        inner.disposed.set(true);

        if let Some(id) = inner.demand_subscription.take() {
            inner.production_demand.unsubscribe(id);
        }
        inner.production_demand.release();

        // 终结后不再报告任何残余产出
        inner.entity_count.set(0.0);
        let zeroed: Vec<ResourceQuantity> = inner
            .recipe
            .outputs
            .iter()
            .map(|q| ResourceQuantity {
                resource: q.resource.clone(),
                rate_per_minute: 0.0,
            })
            .collect();
        *inner.outputs.borrow_mut() = zeroed;

        for demand in &inner.inputs {
            if let Err(e) = demand.set_rate(0.0) {
                warn!(recipe = %inner.recipe.name, error = %e, "清零输入需求失败");
            }
        }
    }

    /// 配方
    pub fn recipe(&self) -> &Recipe {
        &self.inner.recipe
    }

    /// 生产需求句柄
    pub fn production_demand(&self) -> Demand {
        self.inner.production_demand.clone()
    }

    /// 当前实体数量
    pub fn entity_count(&self) -> f64 {
        self.inner.entity_count.get()
    }

    /// 实体数量策略的注册名
    pub fn policy_name(&self) -> &str {
        self.inner.policy.name()
    }

    /// 输入需求列表(与配方输入一一对应)
    pub fn inputs(&self) -> &[Demand] {
        &self.inner.inputs
    }

    /// 输出数量快照(与配方输出一一对应)
    pub fn outputs(&self) -> Vec<ResourceQuantity> {
        self.inner.outputs.borrow().clone()
    }

    /// 是否已终结
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// 是否为同一底层单元
    pub fn same_unit(&self, other: &ProductionUnit) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ProductionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionUnit")
            .field("recipe", &self.inner.recipe.name)
            .field("target", &self.inner.production_demand.resource())
            .field("entity_count", &self.inner.entity_count.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}
