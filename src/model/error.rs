// ==========================================
// 制造执行系统 - 模型层错误类型
// ==========================================
// 职责: 模型配置错误与调用方契约违反
// 说明: 普通的数据校验失败不走错误通道，记录在 ValidationOutcome 中
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

use crate::repository::error::RepositoryError;

/// 模型层错误类型
#[derive(Error, Debug)]
pub enum ModelError {
    // ===== 模型定义错误 =====
    #[error("数据定义不存在: {plugin}.{name}")]
    UnknownDataDefinition { plugin: String, name: String },

    #[error("数据定义重复注册: {0}")]
    DuplicateDataDefinition(String),

    #[error("字段不存在: {model}.{field}")]
    UnknownField { model: String, field: String },

    #[error("字段不支持该操作 ({model}.{field}): {message}")]
    UnsupportedFieldOperation {
        model: String,
        field: String,
        message: String,
    },

    #[error("钩子未注册: {0}")]
    UnknownHook(String),

    #[error("模型配置无效: {0}")]
    InvalidSchema(String),

    #[error("正则表达式无效: {0}")]
    InvalidPattern(#[from] regex::Error),

    // ===== 实体错误 =====
    #[error("实体不存在: {model} with id={id}")]
    EntityNotFound { model: String, id: i64 },

    #[error("实体引用未绑定数据访问: {model} with id={id}")]
    DetachedReference { model: String, id: i64 },

    #[error("父实体尚未保存，无法查询关联列表: {field}")]
    UnsavedParent { field: String },

    #[error("数据定义没有排序字段: {0}")]
    MissingPriorityField(String),

    // ===== 表格组件契约错误 =====
    #[error("表格没有范围字段，不能设置范围实体ID")]
    MissingScopeField,

    #[error("未知的表格事件: {0}")]
    UnknownEvent(String),

    #[error("表格状态无效: {0}")]
    InvalidComponentState(String),

    // ===== 下层错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("文件读取失败: {0}")]
    Io(#[from] std::io::Error),
}

/// Result 类型别名
pub type ModelResult<T> = Result<T, ModelError>;
