// ==========================================
// 制造执行系统 - 动态实体模型
// ==========================================
// 数据定义（字段、类型、钩子）+ 注册表 + 运行期实体与关联
// ==========================================

pub mod definition;
pub mod entity;
pub mod entity_list;
pub mod error;
pub mod field;
pub mod hooks;
pub mod outcome;
pub mod registry;
pub mod types;
pub mod value;

pub use definition::{DataDefinition, DataDefinitionBuilder, DataDefinitionRef};
pub use entity::{Entity, EntityRef};
pub use entity_list::EntityList;
pub use error::{ModelError, ModelResult};
pub use field::FieldDefinition;
pub use hooks::{EntityHook, FieldHook, HookRegistry, SaveHook};
pub use outcome::{ErrorMessage, ValidationOutcome};
pub use registry::{DataDefinitionService, ResolvedPath};
pub use types::{Cascade, FieldType, ValueClass};
pub use value::FieldValue;
