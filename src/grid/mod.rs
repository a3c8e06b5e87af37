// ==========================================
// 制造执行系统 - 表格数据绑定组件
// ==========================================
// 职责: 表格列到字段的映射、JSON 状态恢复与渲染、表格事件
// ==========================================

pub mod column;
pub mod state;

pub use column::GridColumn;
pub use state::{GridMessage, GridState, MessageType};
