// ==========================================
// 制造执行系统 - 插件生命周期
// ==========================================
// 职责: 插件状态机、版本与依赖区间、模块回调、插件管理
// ==========================================

pub mod core;
pub mod error;
pub mod manager;
pub mod module;
pub mod state;
pub mod version;

pub use self::core::{Plugin, PluginBuilder, PluginDependency, PluginInformation};
pub use error::{PluginError, PluginResult};
pub use manager::PluginManager;
pub use module::Module;
pub use state::{is_transition_possible, PluginState};
pub use version::{Version, VersionOfDependency};
