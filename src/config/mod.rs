// ==========================================
// 工厂流水线规划系统 - 配置层
// ==========================================

pub mod engine_config;

pub use engine_config::EngineConfig;
