// ==========================================
// 制造执行系统 - 一对多关联列表
// ==========================================
// 职责: 父实体的子实体集合（延迟加载）
// 约束: 父实体未保存时列表为空，且不访问存储
// ==========================================

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::model::definition::DataDefinitionRef;
use crate::model::entity::Entity;
use crate::model::error::{ModelError, ModelResult};
use crate::repository::data_access::DataAccess;
use crate::search::criteria::SearchCriteriaBuilder;
use crate::search::restriction::Restrictions;

#[derive(Clone)]
pub struct EntityList {
    target: DataDefinitionRef,
    join_field: String,
    parent_id: Option<i64>,
    access: Option<Arc<dyn DataAccess>>,
    loaded: Arc<OnceLock<Vec<Entity>>>,
}

impl EntityList {
    pub fn new(target: DataDefinitionRef, join_field: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            target,
            join_field: join_field.into(),
            parent_id,
            access: None,
            loaded: Arc::new(OnceLock::new()),
        }
    }

    pub fn with_access(mut self, access: Arc<dyn DataAccess>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn target(&self) -> &DataDefinitionRef {
        &self.target
    }

    pub fn join_field(&self) -> &str {
        &self.join_field
    }

    pub fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// 子实体查询构建器（已限定 join_field = parent_id）
    pub fn find(&self) -> ModelResult<SearchCriteriaBuilder> {
        let parent_id = self.parent_id.ok_or_else(|| ModelError::UnsavedParent {
            field: self.join_field.clone(),
        })?;
        let access = self.require_access(parent_id)?;
        Ok(SearchCriteriaBuilder::new(access, self.target.clone())
            .restricted_with(Restrictions::belongs_to(&self.join_field, parent_id)))
    }

    /// 全部子实体（首次读取触发加载，结果在克隆间共享）
    pub fn entities(&self) -> ModelResult<Vec<Entity>> {
        let Some(parent_id) = self.parent_id else {
            return Ok(Vec::new());
        };
        if let Some(cached) = self.loaded.get() {
            return Ok(cached.clone());
        }
        self.require_access(parent_id)?;
        let result = self.find()?.list()?;
        Ok(self.loaded.get_or_init(|| result.entities).clone())
    }

    pub fn len(&self) -> ModelResult<usize> {
        if self.parent_id.is_none() {
            return Ok(0);
        }
        Ok(self.entities()?.len())
    }

    pub fn is_empty(&self) -> ModelResult<bool> {
        Ok(self.len()? == 0)
    }

    /// 按位置读取子实体
    pub fn get(&self, index: usize) -> ModelResult<Option<Entity>> {
        Ok(self.entities()?.into_iter().nth(index))
    }

    fn require_access(&self, parent_id: i64) -> ModelResult<Arc<dyn DataAccess>> {
        self.access
            .clone()
            .ok_or_else(|| ModelError::DetachedReference {
                model: self.target.to_string(),
                id: parent_id,
            })
    }
}

impl PartialEq for EntityList {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.join_field == other.join_field
            && self.parent_id == other.parent_id
    }
}

impl fmt::Debug for EntityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityList")
            .field("target", &self.target)
            .field("join_field", &self.join_field)
            .field("parent_id", &self.parent_id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsaved_parent_is_empty_without_storage() {
        let list = EntityList::new(DataDefinitionRef::new("basic", "component"), "product", None);
        assert_eq!(list.entities().unwrap(), Vec::<Entity>::new());
        assert_eq!(list.len().unwrap(), 0);
        assert!(list.is_empty().unwrap());
    }

    #[test]
    fn test_find_requires_saved_parent() {
        let list = EntityList::new(DataDefinitionRef::new("basic", "component"), "product", None);
        assert!(matches!(list.find(), Err(ModelError::UnsavedParent { .. })));
    }
}
