// ==========================================
// 工厂流水线规划系统 - 引擎层
// ==========================================
// 职责: 反应式生产树(单元 -> 块 -> 线)与净算规则
// 传播: 需求"变更" -> 单元重算 -> 块重算 -> 线重算,
//       同步、深度优先、可重入,调用返回即整链收敛
// ==========================================

pub mod block;
pub mod line;
pub mod unit;

// 重导出核心类型
pub use block::ProductionBlock;
pub use line::{ProductionLine, BALANCE_EPSILON_PER_MINUTE};
pub use unit::{EntityCountPolicy, PolicyRegistry, ProductionUnit, ProportionalPolicy};
