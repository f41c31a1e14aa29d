// ==========================================
// 工厂流水线规划系统 - 领域模型层
// ==========================================
// 职责: 定义值类型、可观察需求原语与配方实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod demand;
pub mod error;
pub mod quantity;
pub mod recipe;

// 重导出核心类型
pub use demand::{ChangeHandler, CombinedDemand, Demand, ResourceDemand, SubscriptionId};
pub use error::{FlowError, FlowResult};
pub use quantity::ResourceQuantity;
pub use recipe::Recipe;
