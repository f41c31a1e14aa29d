// ==========================================
// 工厂流水线规划系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 层级化资源流计算引擎
//   给定某种产物的目标产出流量,推导全部中间生产需求,
//   聚合为生产单元树,并在树的任意部分变化时
//   保持声明的输入/输出流量一致。
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值类型与可观察需求原语
pub mod domain;

// 引擎层 - 反应式生产树(单元/块/线)
pub mod engine;

// 配方目录层 - 按名称/分类/实体/产出/消耗检索
pub mod catalog;

// 数据仓储层 - 生产方案持久化
pub mod repository;

// 配置层 - 引擎配置
pub mod config;

// 数据库基础设施(连接初始化/PRAGMA 统一)
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CombinedDemand, Demand, FlowError, FlowResult, Recipe, ResourceDemand, ResourceQuantity,
};

// 引擎
pub use engine::{
    EntityCountPolicy, PolicyRegistry, ProductionBlock, ProductionLine, ProductionUnit,
    ProportionalPolicy, BALANCE_EPSILON_PER_MINUTE,
};

// 配方目录
pub use catalog::{CatalogError, MemoryCatalog, RecipeCatalog, SqliteCatalog};

// 仓储
pub use repository::{PlanRecord, PlanRepository, RepositoryError};

// 配置
pub use config::EngineConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "工厂流水线规划系统";
