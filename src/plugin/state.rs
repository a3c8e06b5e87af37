// ==========================================
// 制造执行系统 - 插件状态
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginState {
    Unknown,   // 未知（刚发现，尚未恢复持久化状态）
    Enabling,  // 启用中（等待重启完成）
    Enabled,   // 已启用
    Disabled,  // 已禁用
    Temporary, // 临时（上传后尚未安装）
}

impl PluginState {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginState::Unknown => "UNKNOWN",
            PluginState::Enabling => "ENABLING",
            PluginState::Enabled => "ENABLED",
            PluginState::Disabled => "DISABLED",
            PluginState::Temporary => "TEMPORARY",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNKNOWN" => Some(PluginState::Unknown),
            "ENABLING" => Some(PluginState::Enabling),
            "ENABLED" => Some(PluginState::Enabled),
            "DISABLED" => Some(PluginState::Disabled),
            "TEMPORARY" => Some(PluginState::Temporary),
            _ => None,
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 状态迁移是否合法
///
/// 规则:
/// - 不能迁移到 Unknown，也不能迁移到自身
/// - Unknown 可迁移到任意其他状态
/// - Temporary 只能由 Unknown 进入，且只能迁移到 Enabling
/// - Enabling 不能直接到 Disabled，Enabled 不能回到 Enabling
pub fn is_transition_possible(from: PluginState, to: PluginState) -> bool {
    use PluginState::*;

    if to == Unknown || to == from {
        return false;
    }
    if from == Unknown {
        return true;
    }
    !matches!(
        (from, to),
        (_, Temporary) | (Enabling, Disabled) | (Enabled, Enabling) | (Temporary, Enabled) | (Temporary, Disabled)
    )
}
