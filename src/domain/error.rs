// ==========================================
// 工厂流水线规划系统 - 领域层错误类型
// ==========================================
// 职责: 定义资源流计算核心的错误分类
// 红线: 校验失败即拒绝,不截断、不重试、不取默认值
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 资源流计算核心错误类型
///
/// 所有错误均为 fail-fast: 校验失败时不应用任何变更,
/// 树保持在上一次合法状态,没有部分应用路径。
#[derive(Error, Debug)]
pub enum FlowError {
    // ===== 数值错误 =====
    /// 流量为负数或 NaN(数量/需求永远不允许变为负值)
    #[error("非法数值: {context}, rate={rate}")]
    InvalidValue { context: String, rate: f64 },

    // ===== 结构错误 =====
    /// 结构性非法操作(直接设置聚合需求流量、移除主单元、
    /// 合并不同资源的需求、配方不产出目标资源等)
    #[error("非法操作: {0}")]
    InvalidOperation(String),

    // ===== 文本格式错误 =====
    /// "resource rate" 文本编码解析失败
    #[error("格式错误: {0}")]
    FormatError(String),
}

impl FlowError {
    /// 构造数值错误
    pub fn invalid_value(context: impl Into<String>, rate: f64) -> Self {
        FlowError::InvalidValue {
            context: context.into(),
            rate,
        }
    }

    /// 构造结构错误
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        FlowError::InvalidOperation(message.into())
    }
}

/// Result 类型别名
pub type FlowResult<T> = Result<T, FlowError>;
