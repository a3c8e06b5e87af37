// ==========================================
// 制造执行系统 - 实体存储接口
// ==========================================
// 职责: 动态实体的底层增删改查与条件查询
// 红线: 存储不含业务逻辑（校验、钩子、级联由 DataAccessService 负责）
// ==========================================

use std::sync::Arc;

use crate::model::definition::{DataDefinition, DataDefinitionRef};
use crate::model::entity::Entity;
use crate::model::field::FieldDefinition;
use crate::model::types::FieldType;
use crate::repository::error::RepositoryResult;
use crate::search::criteria::SearchCriteria;
use crate::search::result::SearchResult;

/// 实体存储
///
/// 返回的实体中多对一字段为未绑定的 EntityRef，一对多字段不出现
pub trait EntityStore: Send + Sync {
    /// 为数据定义准备存储结构（表/内存分区），可重复调用
    fn ensure_schema(&self, definition: &DataDefinition) -> RepositoryResult<()>;

    fn get(&self, definition: &DataDefinition, id: i64) -> RepositoryResult<Option<Entity>>;

    /// 插入新实体，返回分配的ID
    fn insert(&self, definition: &DataDefinition, entity: &Entity) -> RepositoryResult<i64>;

    /// 更新已存在的实体（实体必须带ID）
    fn update(&self, definition: &DataDefinition, entity: &Entity) -> RepositoryResult<()>;

    /// 删除实体，返回是否确实删除了记录
    fn delete(&self, definition: &DataDefinition, id: i64) -> RepositoryResult<bool>;

    /// 条件查询（限制条件取值已按字段类型转换）
    fn search(
        &self,
        definition: &Arc<DataDefinition>,
        criteria: &SearchCriteria,
    ) -> RepositoryResult<SearchResult>;
}

/// 表名: {plugin}_{model}
pub fn table_name(reference: &DataDefinitionRef) -> String {
    format!("{}_{}", reference.plugin, reference.name)
}

/// 列名: 多对一字段为 {field}_id，其余同字段名
pub fn column_name(field: &FieldDefinition) -> String {
    match field.field_type() {
        FieldType::BelongsTo { .. } => format!("{}_id", field.name()),
        _ => field.name().to_string(),
    }
}
