// ==========================================
// 制造执行系统 - 内存实体存储
// ==========================================
// 职责: 进程内存储（测试与嵌入场景），查询语义与 SQLite 存储一致
// 语义:
// - 比较条件遇到空值不成立（同 SQL NULL）
// - 通配符匹配仅折叠 ASCII 大小写（同 SQLite LIKE）
// - 升序时空值在前，降序时空值在后；同值按ID升序
// ==========================================

use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::model::definition::{DataDefinition, DataDefinitionRef};
use crate::model::entity::Entity;
use crate::model::registry::DataDefinitionService;
use crate::model::value::FieldValue;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::store::EntityStore;
use crate::search::criteria::SearchCriteria;
use crate::search::restriction::{Restriction, WILDCARD};
use crate::search::result::SearchResult;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Entity>,
}

pub struct MemoryEntityStore {
    registry: Arc<DataDefinitionService>,
    tables: Mutex<HashMap<DataDefinitionRef, Table>>,
}

type Tables = HashMap<DataDefinitionRef, Table>;

impl MemoryEntityStore {
    pub fn new(registry: Arc<DataDefinitionService>) -> Self {
        Self {
            registry,
            tables: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn table<'t>(tables: &'t Tables, reference: &DataDefinitionRef) -> RepositoryResult<&'t Table> {
        tables
            .get(reference)
            .ok_or_else(|| RepositoryError::UnknownTable(reference.to_string()))
    }

    fn table_mut<'t>(tables: &'t mut Tables, reference: &DataDefinitionRef) -> RepositoryResult<&'t mut Table> {
        tables
            .get_mut(reference)
            .ok_or_else(|| RepositoryError::UnknownTable(reference.to_string()))
    }

    /// 只保留持久化列
    fn stored_copy(definition: &DataDefinition, entity: &Entity, id: i64) -> Entity {
        let mut stored = Entity::with_id(definition.reference().clone(), id);
        for field in definition.stored_fields() {
            if let Some(value) = entity.field(field.name()) {
                stored.set_field(field.name(), detach(value));
            }
        }
        stored
    }

    /// 读取字段路径上的取值（"field" 或 "relation.field"）
    fn path_value(
        &self,
        tables: &Tables,
        definition: &Arc<DataDefinition>,
        row: &Entity,
        path: &str,
    ) -> RepositoryResult<Option<FieldValue>> {
        if path == "id" {
            return Ok(row.id().map(FieldValue::Integer));
        }
        let resolved = self
            .registry
            .resolve_path(definition, path)
            .map_err(|e| RepositoryError::UnsupportedQuery(e.to_string()))?;
        match &resolved.relation {
            None => Ok(row.field(path).cloned()),
            Some(relation) => {
                let Some(related_id) = row.belongs_to_id(relation) else {
                    return Ok(None);
                };
                let related = Self::table(tables, resolved.definition.reference())?
                    .rows
                    .get(&related_id);
                Ok(related.and_then(|r| r.field(resolved.field().name()).cloned()))
            }
        }
    }

    fn matches(
        &self,
        tables: &Tables,
        definition: &Arc<DataDefinition>,
        row: &Entity,
        restriction: &Restriction,
        like_patterns: &HashMap<String, Regex>,
    ) -> RepositoryResult<bool> {
        Ok(match restriction {
            Restriction::Compare {
                field,
                operator,
                value,
            } => self
                .path_value(tables, definition, row, field)?
                .and_then(|actual| actual.compare(value))
                .map(|ordering| operator.matches(ordering))
                .unwrap_or(false),
            Restriction::Like { field, pattern } => {
                let actual = self.path_value(tables, definition, row, field)?;
                match (actual, like_patterns.get(pattern)) {
                    (Some(actual), Some(regex)) => {
                        regex.is_match(&actual.to_string().to_ascii_lowercase())
                    }
                    _ => false,
                }
            }
            Restriction::IsNull { field } => self.path_value(tables, definition, row, field)?.is_none(),
            Restriction::IsNotNull { field } => self.path_value(tables, definition, row, field)?.is_some(),
            Restriction::BelongsTo { field, id } => row.belongs_to_id(field) == Some(*id),
            Restriction::Id { operator, id } => row
                .id()
                .map(|own| operator.matches(own.cmp(id)))
                .unwrap_or(false),
        })
    }
}

/// 通配符模式转为整体匹配正则；模式与取值均只折叠 ASCII 大小写
fn glob_to_regex(pattern: &str) -> RepositoryResult<Regex> {
    let folded = pattern.to_ascii_lowercase();
    let body: Vec<String> = folded.split(WILDCARD).map(regex::escape).collect();
    Regex::new(&format!("(?s)^{}$", body.join(".*")))
        .map_err(|e| RepositoryError::UnsupportedQuery(e.to_string()))
}

/// 存储中的引用不携带数据访问句柄
fn detach(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::BelongsTo(reference) => FieldValue::BelongsTo(crate::model::entity::EntityRef::new(
            reference.target().clone(),
            reference.id(),
        )),
        other => other.clone(),
    }
}

/// 空值最小
fn compare_nullable(a: &Option<FieldValue>, b: &Option<FieldValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

impl EntityStore for MemoryEntityStore {
    fn ensure_schema(&self, definition: &DataDefinition) -> RepositoryResult<()> {
        let mut tables = self.lock()?;
        tables
            .entry(definition.reference().clone())
            .or_insert_with(|| Table {
                next_id: 1,
                rows: BTreeMap::new(),
            });
        Ok(())
    }

    fn get(&self, definition: &DataDefinition, id: i64) -> RepositoryResult<Option<Entity>> {
        let tables = self.lock()?;
        Ok(Self::table(&tables, definition.reference())?.rows.get(&id).cloned())
    }

    fn insert(&self, definition: &DataDefinition, entity: &Entity) -> RepositoryResult<i64> {
        let mut tables = self.lock()?;
        let table = Self::table_mut(&mut tables, definition.reference())?;
        let id = table.next_id;
        table.next_id += 1;
        table.rows.insert(id, Self::stored_copy(definition, entity, id));
        debug!(model = %definition.reference(), id, "内存存储插入");
        Ok(id)
    }

    fn update(&self, definition: &DataDefinition, entity: &Entity) -> RepositoryResult<()> {
        let id = entity.id().ok_or_else(|| {
            RepositoryError::InternalError(format!("更新 {} 时实体缺少ID", definition.reference()))
        })?;
        let mut tables = self.lock()?;
        let table = Self::table_mut(&mut tables, definition.reference())?;
        if !table.rows.contains_key(&id) {
            return Err(RepositoryError::NotFound {
                entity: definition.reference().to_string(),
                id: id.to_string(),
            });
        }
        table.rows.insert(id, Self::stored_copy(definition, entity, id));
        Ok(())
    }

    fn delete(&self, definition: &DataDefinition, id: i64) -> RepositoryResult<bool> {
        let mut tables = self.lock()?;
        let table = Self::table_mut(&mut tables, definition.reference())?;
        Ok(table.rows.remove(&id).is_some())
    }

    fn search(
        &self,
        definition: &Arc<DataDefinition>,
        criteria: &SearchCriteria,
    ) -> RepositoryResult<SearchResult> {
        let mut like_patterns = HashMap::new();
        for restriction in criteria.restrictions() {
            if let Restriction::Like { pattern, .. } = restriction {
                like_patterns.insert(pattern.clone(), glob_to_regex(pattern)?);
            }
        }

        let tables = self.lock()?;
        let table = Self::table(&tables, definition.reference())?;

        let mut matched: Vec<(Entity, Option<FieldValue>)> = Vec::new();
        for row in table.rows.values() {
            let mut keep = true;
            for restriction in criteria.restrictions() {
                if !self.matches(&tables, definition, row, restriction, &like_patterns)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                let sort_key = match criteria.order() {
                    Some(order) => self.path_value(&tables, definition, row, &order.field)?,
                    None => None,
                };
                matched.push((row.clone(), sort_key));
            }
        }

        if let Some(order) = criteria.order() {
            let ascending = order.is_asc();
            matched.sort_by(|(a, ka), (b, kb)| {
                let by_key = compare_nullable(ka, kb);
                let by_key = if ascending { by_key } else { by_key.reverse() };
                by_key.then_with(|| a.id().cmp(&b.id()))
            });
        }

        let total = matched.len();
        let entities: Vec<Entity> = matched
            .into_iter()
            .map(|(entity, _)| entity)
            .skip(criteria.first_result())
            .take(criteria.max_results())
            .collect();

        debug!(criteria = %criteria, total, returned = entities.len(), "内存存储查询");
        Ok(SearchResult::new(entities, total))
    }
}
