// ==========================================
// 工厂流水线规划系统 - 引擎配置
// ==========================================
// 职责: 配置加载、默认值、持久化
// 存储: JSON 配置文件(嵌入方可覆写路径)
// ==========================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 平衡残余清理阈值默认值(单位/分钟)
fn default_balance_epsilon() -> f64 {
    crate::engine::line::BALANCE_EPSILON_PER_MINUTE
}

/// 默认语言
fn default_locale() -> String {
    "zh-CN".to_string()
}

/// 引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 平衡残余清理阈值(单位/分钟)
    #[serde(default = "default_balance_epsilon")]
    pub balance_epsilon_per_minute: f64,

    /// 界面语言("zh-CN" 或 "en")
    #[serde(default = "default_locale")]
    pub locale: String,

    /// 数据目录(缺省时使用系统目录)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            balance_epsilon_per_minute: default_balance_epsilon(),
            locale: default_locale(),
            data_dir: None,
        }
    }
}

impl EngineConfig {
    /// 从 JSON 文件加载;文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 保存到 JSON 文件(父目录不存在时创建)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("创建配置目录失败: {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        Ok(())
    }

    /// 解析数据目录: 显式配置优先,否则系统数据目录下的应用目录
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("factory-planner")
    }

    /// 默认数据库文件路径
    pub fn default_db_path(&self) -> PathBuf {
        self.resolve_data_dir().join("factory_planner.db")
    }
}
