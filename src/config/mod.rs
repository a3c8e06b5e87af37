// ==========================================
// 制造执行系统 - 配置层
// ==========================================
// - settings: 运行配置（数据库、语言、日志、表格分页）
// - schema_config: 声明式数据模型（JSON）
// ==========================================

pub mod schema_config;
pub mod settings;

pub use schema_config::{FieldSchema, ModelSchema, PluginSchema, SchemaConfig, ValidatorSchema};
pub use settings::{default_db_path, LogFormat, MesSettings};
