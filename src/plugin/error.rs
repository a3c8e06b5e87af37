// ==========================================
// 制造执行系统 - 插件层错误类型
// ==========================================

use thiserror::Error;

use crate::plugin::state::PluginState;
use crate::repository::error::RepositoryError;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("插件 {identifier} 不能从 {from} 迁移到 {to}")]
    InvalidStateTransition {
        identifier: String,
        from: PluginState,
        to: PluginState,
    },

    #[error("不能比较不同插件的版本: {0} 与 {1}")]
    DifferentPlugins(String, String),

    #[error("插件 {0} 处于未知状态，不能初始化")]
    UnknownState(String),

    #[error("版本格式无效: {0}")]
    InvalidVersion(String),

    #[error("插件未注册: {0}")]
    PluginNotFound(String),

    #[error("插件已注册: {0}")]
    DuplicatePlugin(String),

    #[error("插件 {identifier} 的依赖不满足: {dependency} {required}")]
    UnsatisfiedDependency {
        identifier: String,
        dependency: String,
        required: String,
    },

    #[error("系统插件不能禁用: {0}")]
    SystemPlugin(String),

    #[error("插件 {identifier} 仍被已启用的插件依赖: {dependents:?}")]
    HasEnabledDependents {
        identifier: String,
        dependents: Vec<String>,
    },

    #[error("插件 {identifier} 的模块执行失败: {source}")]
    ModuleFailure {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type PluginResult<T> = Result<T, PluginError>;
