// ==========================================
// 制造执行系统 - 数据仓储层
// ==========================================
// 红线: 存储实现不含业务逻辑（校验、钩子、级联由 DataAccessService 负责）
// ==========================================
// 职责: 实体存储（内存 / SQLite）、数据访问服务、插件状态持久化
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod data_access;
pub mod error;
pub mod memory_store;
pub mod plugin_state_repo;
pub mod sql_builder;
pub mod sqlite_store;
pub mod store;

// 重导出核心仓储
pub use data_access::{DataAccess, DataAccessService, SaveOutcome};
pub use error::{RepositoryError, RepositoryResult};
pub use memory_store::MemoryEntityStore;
pub use plugin_state_repo::{PluginStateRecord, PluginStateRepository};
pub use sql_builder::SqlQueryBuilder;
pub use sqlite_store::SqliteEntityStore;
pub use store::EntityStore;
