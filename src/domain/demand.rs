// ==========================================
// 工厂流水线规划系统 - 资源需求与聚合需求
// ==========================================
// 职责: 可观察的流量需求(依赖树的原子单元)与其聚合变体
// 传播模型: 单线程、同步、深度优先、可重入的回调链
// 红线: 订阅必须显式退订,否则即为泄漏缺陷
// ==========================================

use crate::domain::error::{FlowError, FlowResult};
use crate::domain::quantity::ResourceQuantity;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

// ==========================================
// 订阅管理
// ==========================================

/// 订阅句柄标识
pub type SubscriptionId = u64;

/// 变更回调
pub type ChangeHandler = Rc<dyn Fn()>;

/// 显式订阅列表
///
/// 通知时先对处理器列表做快照再逐个调用,
/// 处理器因此可以在回调中重入地订阅/退订。
pub(crate) struct SubscriberList {
    next_id: Cell<SubscriptionId>,
    handlers: RefCell<Vec<(SubscriptionId, ChangeHandler)>>,
}

impl SubscriberList {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            handlers: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    /// 退订,返回该 id 是否仍在列表中
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        handlers.len() != before
    }

    pub(crate) fn notify(&self) {
        let snapshot: Vec<ChangeHandler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in snapshot {
            handler();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handlers.borrow().len()
    }
}

// ==========================================
// ResourceDemand - 单一资源需求
// ==========================================

/// 单一资源需求
///
/// 可变、引用语义: 同一时刻由恰好一个 ProductionUnit 持有,
/// 或作为源聚合在某个 CombinedDemand 之内。
pub struct ResourceDemand {
    resource: String,
    rate_per_minute: Cell<f64>,
    satisfied: Cell<bool>,
    subscribers: SubscriberList,
}

impl ResourceDemand {
    fn new(resource: String, rate_per_minute: f64) -> FlowResult<Rc<Self>> {
        if rate_per_minute.is_nan() || rate_per_minute < 0.0 {
            return Err(FlowError::invalid_value(
                format!("ResourceDemand::new({})", resource),
                rate_per_minute,
            ));
        }
        Ok(Rc::new(Self {
            resource,
            rate_per_minute: Cell::new(rate_per_minute),
            satisfied: Cell::new(false),
            subscribers: SubscriberList::new(),
        }))
    }

    /// 设置流量,成功后同步通知所有订阅者
    ///
    /// # 错误
    /// - `InvalidValue`: rate 为负数或 NaN(不应用任何变更)
    fn set_rate(&self, rate: f64) -> FlowResult<()> {
        if rate.is_nan() || rate < 0.0 {
            return Err(FlowError::invalid_value(
                format!("ResourceDemand::set_rate({})", self.resource),
                rate,
            ));
        }
        self.rate_per_minute.set(rate);
        self.subscribers.notify();
        Ok(())
    }
}

// ==========================================
// CombinedDemand - 聚合需求
// ==========================================

/// 聚合需求
///
/// 持有有序源需求列表(插入顺序,合并时保序);
/// 自身流量恒等于各源流量之和,不允许直接设置。
/// "谁满足了聚合,就满足了每个组成部分":
/// satisfied 写入会递归下发到所有源。
pub struct CombinedDemand {
    resource: String,
    rate_per_minute: Cell<f64>,
    satisfied: Cell<bool>,
    sources: Vec<Demand>,
    /// 与 sources 一一对应的订阅句柄,release 时退订
    source_subscriptions: RefCell<Vec<SubscriptionId>>,
    subscribers: SubscriberList,
    released: Cell<bool>,
}

impl CombinedDemand {
    /// 从源列表构造;成员构造后不再变化,
    /// 重排树意味着丢弃重建并重新接线。
    ///
    /// # 错误
    /// - `InvalidOperation`: 源列表为空,或源资源不一致
    fn new(sources: Vec<Demand>) -> FlowResult<Rc<Self>> {
        let first = sources
            .first()
            .ok_or_else(|| FlowError::invalid_operation("聚合需求至少需要一个源"))?;
        let resource = first.resource().to_string();
        for src in &sources {
            if src.resource() != resource {
                return Err(FlowError::invalid_operation(format!(
                    "聚合需求的源资源不一致: {} vs {}",
                    resource,
                    src.resource()
                )));
            }
        }

        let sum: f64 = sources.iter().map(|d| d.rate_per_minute()).sum();
        let combined = Rc::new(Self {
            resource,
            rate_per_minute: Cell::new(sum),
            satisfied: Cell::new(false),
            sources,
            source_subscriptions: RefCell::new(Vec::new()),
            subscribers: SubscriberList::new(),
            released: Cell::new(false),
        });

        // 订阅每个源: 源变化 -> 重算总和 -> 通知自身订阅者
        let mut subscription_ids = Vec::with_capacity(combined.sources.len());
        for src in &combined.sources {
            let weak: Weak<CombinedDemand> = Rc::downgrade(&combined);
            let id = src.subscribe(Rc::new(move || {
                if let Some(cell) = weak.upgrade() {
                    cell.refresh();
                }
            }));
            subscription_ids.push(id);
        }
        *combined.source_subscriptions.borrow_mut() = subscription_ids;

        Ok(combined)
    }

    /// 源变化后重算总和并向上通知
    fn refresh(&self) {
        let sum: f64 = self.sources.iter().map(|d| d.rate_per_minute()).sum();
        self.rate_per_minute.set(sum);
        self.subscribers.notify();
    }

    /// 递归下发 satisfied 标记
    fn set_satisfied(&self, satisfied: bool) {
        self.satisfied.set(satisfied);
        for src in &self.sources {
            src.set_satisfied(satisfied);
        }
    }

    /// 释放对所有源的订阅(幂等)
    ///
    /// 仅持有方 dispose 时调用;聚合方退出只做退订,不处置源。
    fn release(&self) {
        if self.released.get() {
            return;
        }
        self.released.set(true);
        let ids = self.source_subscriptions.borrow_mut().split_off(0);
        for (src, id) in self.sources.iter().zip(ids) {
            src.unsubscribe(id);
        }
    }
}

// ==========================================
// Demand - 需求句柄(两个变体共享 rate/satisfied 契约)
// ==========================================

/// 需求句柄
///
/// `Rc` 共享引用语义: clone 得到同一底层需求的另一个句柄。
#[derive(Clone)]
pub enum Demand {
    /// 单一需求
    Single(Rc<ResourceDemand>),
    /// 聚合需求
    Combined(Rc<CombinedDemand>),
}

impl Demand {
    /// 创建单一需求
    ///
    /// # 错误
    /// - `InvalidValue`: rate 为负数或 NaN
    pub fn single(resource: impl Into<String>, rate_per_minute: f64) -> FlowResult<Demand> {
        Ok(Demand::Single(ResourceDemand::new(
            resource.into(),
            rate_per_minute,
        )?))
    }

    /// 从已校验的流量创建单一需求(crate 内部使用)
    pub(crate) fn single_unchecked(resource: String, rate_per_minute: f64) -> Demand {
        debug_assert!(rate_per_minute >= 0.0);
        Demand::Single(Rc::new(ResourceDemand {
            resource,
            rate_per_minute: Cell::new(rate_per_minute),
            satisfied: Cell::new(false),
            subscribers: SubscriberList::new(),
        }))
    }

    /// 从源列表创建聚合需求
    ///
    /// # 错误
    /// - `InvalidOperation`: 源列表为空,或源资源不一致
    pub fn combined(sources: Vec<Demand>) -> FlowResult<Demand> {
        Ok(Demand::Combined(CombinedDemand::new(sources)?))
    }

    /// 资源标识
    pub fn resource(&self) -> &str {
        match self {
            Demand::Single(d) => &d.resource,
            Demand::Combined(d) => &d.resource,
        }
    }

    /// 当前流量(单位/分钟)
    pub fn rate_per_minute(&self) -> f64 {
        match self {
            Demand::Single(d) => d.rate_per_minute.get(),
            Demand::Combined(d) => d.rate_per_minute.get(),
        }
    }

    /// satisfied 标记(树中是否已有生产者满足该需求)
    pub fn satisfied(&self) -> bool {
        match self {
            Demand::Single(d) => d.satisfied.get(),
            Demand::Combined(d) => d.satisfied.get(),
        }
    }

    /// 设置 satisfied 标记,聚合需求递归下发到所有源
    pub fn set_satisfied(&self, satisfied: bool) {
        match self {
            Demand::Single(d) => d.satisfied.set(satisfied),
            Demand::Combined(d) => d.set_satisfied(satisfied),
        }
    }

    /// 设置流量,成功后同步通知订阅者
    ///
    /// # 错误
    /// - `InvalidValue`: rate 为负数或 NaN
    /// - `InvalidOperation`: 聚合需求的流量不允许直接设置
    pub fn set_rate(&self, rate: f64) -> FlowResult<()> {
        match self {
            Demand::Single(d) => d.set_rate(rate),
            Demand::Combined(d) => Err(FlowError::invalid_operation(format!(
                "聚合需求的流量由源决定,不能直接设置: {}",
                d.resource
            ))),
        }
    }

    /// 订阅"变更"通知
    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        match self {
            Demand::Single(d) => d.subscribers.subscribe(handler),
            Demand::Combined(d) => d.subscribers.subscribe(handler),
        }
    }

    /// 退订,返回该 id 是否仍在订阅列表中
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self {
            Demand::Single(d) => d.subscribers.unsubscribe(id),
            Demand::Combined(d) => d.subscribers.unsubscribe(id),
        }
    }

    /// 合并两个需求,返回新的聚合需求
    ///
    /// 源列表为展平后的并集(保序: 左操作数的源在前)。
    /// 聚合操作数贡献其源而非自身,因此合并产生的嵌套不超过一层。
    ///
    /// # 错误
    /// - `InvalidOperation`: 资源不同
    pub fn combine(&self, other: &Demand) -> FlowResult<Demand> {
        if self.resource() != other.resource() {
            return Err(FlowError::invalid_operation(format!(
                "不同资源的需求不能合并: {} vs {}",
                self.resource(),
                other.resource()
            )));
        }
        let mut sources = Vec::new();
        self.flatten_into(&mut sources);
        other.flatten_into(&mut sources);
        Demand::combined(sources)
    }

    /// 展平一层: 聚合需求贡献其源,单一需求贡献自身
    fn flatten_into(&self, out: &mut Vec<Demand>) {
        match self {
            Demand::Single(_) => out.push(self.clone()),
            Demand::Combined(d) => out.extend(d.sources.iter().cloned()),
        }
    }

    /// 聚合需求的源列表视图(单一需求为空)
    pub fn sources(&self) -> Vec<Demand> {
        match self {
            Demand::Single(_) => Vec::new(),
            Demand::Combined(d) => d.sources.clone(),
        }
    }

    /// 是否为聚合需求
    pub fn is_combined(&self) -> bool {
        matches!(self, Demand::Combined(_))
    }

    /// 释放聚合需求对源的订阅;单一需求无此资源,no-op
    pub fn release(&self) {
        if let Demand::Combined(d) = self {
            d.release();
        }
    }

    /// 是否为同一底层需求
    pub fn ptr_eq(&self, other: &Demand) -> bool {
        match (self, other) {
            (Demand::Single(a), Demand::Single(b)) => Rc::ptr_eq(a, b),
            (Demand::Combined(a), Demand::Combined(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// 当前状态的数量快照
    pub fn to_quantity(&self) -> ResourceQuantity {
        ResourceQuantity {
            resource: self.resource().to_string(),
            rate_per_minute: self.rate_per_minute(),
        }
    }
}

impl std::fmt::Debug for Demand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_combined() { "Combined" } else { "Single" };
        f.debug_struct("Demand")
            .field("kind", &kind)
            .field("resource", &self.resource())
            .field("rate_per_minute", &self.rate_per_minute())
            .field("satisfied", &self.satisfied())
            .finish()
    }
}
