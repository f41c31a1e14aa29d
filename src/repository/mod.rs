// ==========================================
// 工厂流水线规划系统 - 数据仓储层
// ==========================================
// 职责: 生产方案的持久化(核心不定义磁盘布局之外的语义,
//       load -> save -> load 必须还原可观察等价的树)
// ==========================================

pub mod error;
pub mod plan_doc;
pub mod plan_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use plan_doc::{decode_line, encode_line, BlockDoc, DemandDoc, LineDoc, UnitDoc};
pub use plan_repo::{PlanRecord, PlanRepository};
