// ==========================================
// 工厂流水线规划系统 - 生产线
// ==========================================
// 职责: 生产块集合的全线净算,
//       内部产出抵消内部消耗,只保留对外的盈余/缺口
// 红线: 平衡扫描按列表顺序,不排序、不选最优配对
// ==========================================

use crate::domain::demand::{ChangeHandler, SubscriberList, SubscriptionId};
use crate::domain::error::{FlowError, FlowResult};
use crate::domain::quantity::ResourceQuantity;
use crate::engine::block::{merge_quantities, ProductionBlock};
use crate::engine::unit::ProductionUnit;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// 平衡后残余输出的清理阈值(单位/分钟)
///
/// 浮点累积误差的让步,不是语义上的抵消。
pub const BALANCE_EPSILON_PER_MINUTE: f64 = 0.001;

// ==========================================
// ProductionLine - 生产线
// ==========================================

struct LineInner {
    blocks: RefCell<Vec<(ProductionBlock, SubscriptionId)>>,
    inputs: RefCell<Vec<ResourceQuantity>>,
    outputs: RefCell<Vec<ResourceQuantity>>,
    balance_epsilon: f64,
    subscribers: SubscriberList,
}

impl LineInner {
    /// 全线净算
    ///
    /// 1. 输入 = 各块流量 > 0 的未满足输入,转为数量
    /// 2. 输出 = 各块流量 > 0 的净输出
    /// 3. 两侧各自同资源合并
    /// 4. 平衡扫描(外层输出、内层输入,严格列表顺序)
    /// 5. epsilon 清理残余输出
    fn recompute(&self) {
        let blocks = self.blocks.borrow();

        let mut inputs: Vec<ResourceQuantity> = Vec::new();
        let mut outputs: Vec<ResourceQuantity> = Vec::new();
        for (block, _) in blocks.iter() {
            inputs.extend(
                block
                    .input_quantities()
                    .into_iter()
                    .filter(|q| q.rate_per_minute > 0.0),
            );
            outputs.extend(
                block
                    .outputs()
                    .into_iter()
                    .filter(|q| q.rate_per_minute > 0.0),
            );
        }
        drop(blocks);

        let mut inputs = merge_quantities(inputs);
        let outputs = merge_quantities(outputs);

        // 平衡扫描。配对顺序就是插入顺序: 结果只在块/单元
        // 插入顺序确定时才确定,此顺序作为兼容性契约保留,
        // 并不声称是唯一正确的净算策略。
        let mut balanced: Vec<ResourceQuantity> = Vec::new();
        for mut output in outputs {
            let mut consumed = false;
            let mut i = 0;
            while i < inputs.len() {
                if inputs[i].resource != output.resource {
                    i += 1;
                    continue;
                }
                if output.rate_per_minute < inputs[i].rate_per_minute {
                    // 输入保留差额,输出整体消去,停止扫描
                    inputs[i].rate_per_minute -= output.rate_per_minute;
                    consumed = true;
                    break;
                } else if output.rate_per_minute > inputs[i].rate_per_minute {
                    // 输出保留差额,该输入消去,继续扫描后续输入
                    output.rate_per_minute -= inputs[i].rate_per_minute;
                    inputs.remove(i);
                } else {
                    // 恰好抵消,双双消去
                    inputs.remove(i);
                    consumed = true;
                    break;
                }
            }
            if !consumed && output.rate_per_minute >= self.balance_epsilon {
                balanced.push(output);
            }
        }

        *self.inputs.borrow_mut() = inputs;
        *self.outputs.borrow_mut() = balanced;

        self.subscribers.notify();
    }
}

/// 生产线句柄(`Rc` 共享,clone 得到同一条线)
#[derive(Clone)]
pub struct ProductionLine {
    inner: Rc<LineInner>,
}

impl ProductionLine {
    /// 创建空生产线(默认清理阈值)
    pub fn new() -> ProductionLine {
        Self::with_epsilon(BALANCE_EPSILON_PER_MINUTE)
    }

    /// 指定清理阈值创建
    pub fn with_epsilon(balance_epsilon: f64) -> ProductionLine {
        ProductionLine {
            inner: Rc::new(LineInner {
                blocks: RefCell::new(Vec::new()),
                inputs: RefCell::new(Vec::new()),
                outputs: RefCell::new(Vec::new()),
                balance_epsilon,
                subscribers: SubscriberList::new(),
            }),
        }
    }

    /// 添加生产块: 订阅其 "IO 变更",随后重算
    pub fn add_block(&self, block: ProductionBlock) {
        let weak: Weak<LineInner> = Rc::downgrade(&self.inner);
        let id = block.subscribe(Rc::new(move || {
            if let Some(line) = weak.upgrade() {
                line.recompute();
            }
        }));
        self.inner.blocks.borrow_mut().push((block, id));
        self.inner.recompute();
    }

    /// 便捷入口: 将单元包进新生产块后加入,返回块句柄
    pub fn add_unit(&self, unit: ProductionUnit) -> ProductionBlock {
        let block = ProductionBlock::new(unit);
        self.add_block(block.clone());
        block
    }

    /// 移除生产块: 退订并重算
    ///
    /// 不 dispose 块内单元,拆除所有权归调用方。
    ///
    /// # 错误
    /// - `InvalidOperation`: 块不在生产线中
    pub fn remove_block(&self, block: &ProductionBlock) -> FlowResult<()> {
        let pos = {
            let blocks = self.inner.blocks.borrow();
            blocks.iter().position(|(b, _)| b.same_block(block))
        };
        let pos = pos
            .ok_or_else(|| FlowError::invalid_operation("生产块不在该生产线中"))?;

        let (removed, id) = self.inner.blocks.borrow_mut().remove(pos);
        removed.unsubscribe(id);
        self.inner.recompute();
        Ok(())
    }

    /// 生产块列表快照
    pub fn blocks(&self) -> Vec<ProductionBlock> {
        self.inner
            .blocks
            .borrow()
            .iter()
            .map(|(b, _)| b.clone())
            .collect()
    }

    /// 全线净输入快照(对外缺口)
    pub fn inputs(&self) -> Vec<ResourceQuantity> {
        self.inner.inputs.borrow().clone()
    }

    /// 全线净输出快照(对外盈余)
    pub fn outputs(&self) -> Vec<ResourceQuantity> {
        self.inner.outputs.borrow().clone()
    }

    /// 订阅生产线 "IO 变更" 通知
    pub fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
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
}

impl Default for ProductionLine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProductionLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionLine")
            .field("blocks", &self.inner.blocks.borrow().len())
            .field("inputs", &self.inner.inputs.borrow())
            .field("outputs", &self.inner.outputs.borrow())
            .finish()
    }
}
