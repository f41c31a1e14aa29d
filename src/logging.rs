// ==========================================
// 工厂流水线规划系统 - 日志初始化
// ==========================================
// 工具: tracing + tracing-subscriber (EnvFilter)
// 约定: 引擎内部只打 warn 及以上,正常重算不产生日志
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化全局日志订阅者
///
/// 级别由 `RUST_LOG` 控制,未设置时为 info。
/// 排查重算链路时用 `RUST_LOG=factory_planner=trace`。
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 测试用初始化: debug 级别,输出交给测试捕获
///
/// 可重复调用,重复初始化被忽略。
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
