// ==========================================
// 制造执行系统 - SQLite 实体存储
// ==========================================
// 职责: 每个数据定义一张表 ({plugin}_{model})，条件查询翻译为参数化 SQL
// 列映射:
// - 文本/枚举/小数/日期/日期时间 -> TEXT（小数按规范化字符串存储）
// - 整数/排序号 -> INTEGER，布尔 -> INTEGER 0/1
// - 多对一 -> {field}_id INTEGER REFERENCES 目标表(id)
// - 一对多、非持久化字段不落库
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::db;
use crate::model::definition::DataDefinition;
use crate::model::entity::{Entity, EntityRef};
use crate::model::field::FieldDefinition;
use crate::model::registry::DataDefinitionService;
use crate::model::types::FieldType;
use crate::model::value::{FieldValue, DATE_FORMAT, DATE_TIME_FORMAT};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{glob_to_like, quote_identifier, SqlQueryBuilder};
use crate::repository::store::{column_name, table_name, EntityStore};
use crate::search::criteria::{OrderDirection, SearchCriteria};
use crate::search::restriction::Restriction;
use crate::search::result::SearchResult;

/// 主表别名
const ALIAS: &str = "t";

pub struct SqliteEntityStore {
    conn: Arc<Mutex<Connection>>,
    registry: Arc<DataDefinitionService>,
}

impl SqliteEntityStore {
    /// 打开数据库文件（应用统一 PRAGMA）
    pub fn new(db_path: &str, registry: Arc<DataDefinitionService>) -> RepositoryResult<Self> {
        let conn = db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            registry,
        })
    }

    /// 从已有连接创建存储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>, registry: Arc<DataDefinitionService>) -> Self {
        Self { conn, registry }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 共享连接（插件状态仓储与实体表使用同一数据库）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    /// 为全部已注册的数据定义建表，并记录存储结构版本
    pub fn ensure_all(&self) -> RepositoryResult<()> {
        for definition in self.registry.definitions() {
            self.ensure_schema(definition)?;
        }
        let conn = self.get_conn()?;
        if let Some(stored) = db::read_schema_version(&conn)? {
            if stored > db::CURRENT_SCHEMA_VERSION {
                warn!(stored, current = db::CURRENT_SCHEMA_VERSION, "数据库结构版本高于当前程序");
            }
        }
        db::record_schema_version(&conn)?;
        Ok(())
    }

    fn select_list(definition: &DataDefinition) -> String {
        let mut columns = vec![format!("{}.id", ALIAS)];
        columns.extend(
            definition
                .stored_fields()
                .map(|f| format!("{}.{}", ALIAS, quote_identifier(&column_name(f)))),
        );
        columns.join(", ")
    }

    fn select_clause(definition: &DataDefinition) -> String {
        format!(
            "SELECT {} FROM {} {}",
            Self::select_list(definition),
            quote_identifier(&table_name(definition.reference())),
            ALIAS
        )
    }

    /// 将一行原始值映射为实体
    fn map_row(definition: &DataDefinition, raw: Vec<Value>) -> RepositoryResult<Entity> {
        let mut values = raw.into_iter();
        let id = match values.next() {
            Some(Value::Integer(id)) => id,
            other => {
                return Err(RepositoryError::InternalError(format!(
                    "{} 的ID列无效: {:?}",
                    definition.reference(),
                    other
                )))
            }
        };
        let mut entity = Entity::with_id(definition.reference().clone(), id);
        for (field, value) in definition.stored_fields().zip(values) {
            entity.set_field_opt(field.name(), from_sql(field, value)?);
        }
        Ok(entity)
    }

    fn query_entities(
        conn: &Connection,
        definition: &DataDefinition,
        sql: &str,
        params: &[Value],
    ) -> RepositoryResult<Vec<Entity>> {
        let width = definition.stored_fields().count() + 1;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            (0..width).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<Value>>>()
        })?;

        let mut entities = Vec::new();
        for raw in rows {
            entities.push(Self::map_row(definition, raw?)?);
        }
        Ok(entities)
    }

    /// 字段路径对应的列表达式（必要时追加 JOIN）
    fn column_expr(
        &self,
        definition: &Arc<DataDefinition>,
        path: &str,
        builder: SqlQueryBuilder,
    ) -> RepositoryResult<(String, FieldType, SqlQueryBuilder)> {
        if path == "id" {
            return Ok((format!("{}.id", ALIAS), FieldType::Integer, builder));
        }
        let resolved = self
            .registry
            .resolve_path(definition, path)
            .map_err(|e| RepositoryError::UnsupportedQuery(e.to_string()))?;
        let column = quote_identifier(&column_name(resolved.field()));
        let field_type = resolved.field_type().clone();

        match &resolved.relation {
            None => Ok((format!("{}.{}", ALIAS, column), field_type, builder)),
            Some(relation) => {
                let alias = quote_identifier(&format!("j_{}", relation));
                let join = format!(
                    "LEFT JOIN {} {} ON {}.id = {}.{}",
                    quote_identifier(&table_name(resolved.definition.reference())),
                    alias,
                    alias,
                    ALIAS,
                    quote_identifier(&format!("{}_id", relation))
                );
                Ok((format!("{}.{}", alias, column), field_type, builder.join(&join)))
            }
        }
    }

    /// 限制条件翻译为 WHERE 片段与参数
    fn apply_restriction(
        &self,
        definition: &Arc<DataDefinition>,
        restriction: &Restriction,
        builder: SqlQueryBuilder,
        params: &mut Vec<Value>,
    ) -> RepositoryResult<SqlQueryBuilder> {
        match restriction {
            Restriction::Compare {
                field,
                operator,
                value,
            } => {
                let (expr, field_type, builder) = self.column_expr(definition, field, builder)?;
                if field_type == FieldType::Decimal {
                    params.push(value.as_f64().map(Value::Real).unwrap_or(Value::Null));
                    Ok(builder.where_clause(&format!("CAST({} AS REAL) {} ?", expr, operator.as_sql())))
                } else {
                    params.push(to_sql(value));
                    Ok(builder.where_clause(&format!("{} {} ?", expr, operator.as_sql())))
                }
            }
            Restriction::Like { field, pattern } => {
                let (expr, _, builder) = self.column_expr(definition, field, builder)?;
                params.push(Value::Text(glob_to_like(pattern)));
                Ok(builder.where_clause(&format!("{} LIKE ? ESCAPE '\\'", expr)))
            }
            Restriction::IsNull { field } => {
                let (expr, _, builder) = self.column_expr(definition, field, builder)?;
                Ok(builder.where_clause(&format!("{} IS NULL", expr)))
            }
            Restriction::IsNotNull { field } => {
                let (expr, _, builder) = self.column_expr(definition, field, builder)?;
                Ok(builder.where_clause(&format!("{} IS NOT NULL", expr)))
            }
            Restriction::BelongsTo { field, id } => {
                params.push(Value::Integer(*id));
                Ok(builder.where_clause(&format!(
                    "{}.{} = ?",
                    ALIAS,
                    quote_identifier(&format!("{}_id", field))
                )))
            }
            Restriction::Id { operator, id } => {
                params.push(Value::Integer(*id));
                Ok(builder.where_clause(&format!("{}.id {} ?", ALIAS, operator.as_sql())))
            }
        }
    }
}

/// 字段取值 -> SQL 值
fn to_sql(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Integer(i) => Value::Integer(*i),
        FieldValue::Decimal(d) => Value::Text(d.normalize().to_string()),
        FieldValue::Boolean(b) => Value::Integer(i64::from(*b)),
        FieldValue::Date(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        FieldValue::DateTime(dt) => Value::Text(dt.format(DATE_TIME_FORMAT).to_string()),
        FieldValue::BelongsTo(reference) => Value::Integer(reference.id()),
        FieldValue::HasMany(_) => Value::Null,
    }
}

/// SQL 值 -> 字段取值（按字段类型）
fn from_sql(field: &FieldDefinition, value: Value) -> RepositoryResult<Option<FieldValue>> {
    let invalid = |value: &Value| RepositoryError::FieldValueError {
        field: field.name().to_string(),
        message: format!("无法转换为 {}: {:?}", field.field_type(), value),
    };

    if value == Value::Null {
        return Ok(None);
    }

    let converted = match (field.field_type(), &value) {
        (FieldType::String | FieldType::Text | FieldType::Enum(_), Value::Text(s)) => {
            FieldValue::Text(s.clone())
        }
        (FieldType::Integer | FieldType::Priority { .. }, Value::Integer(i)) => FieldValue::Integer(*i),
        (FieldType::Decimal, Value::Text(s)) => {
            FieldValue::Decimal(Decimal::from_str(s).map_err(|_| invalid(&value))?)
        }
        (FieldType::Decimal, Value::Integer(i)) => FieldValue::Decimal(Decimal::from(*i)),
        (FieldType::Decimal, Value::Real(r)) => {
            FieldValue::Decimal(Decimal::from_f64(*r).ok_or_else(|| invalid(&value))?)
        }
        (FieldType::Boolean, Value::Integer(i)) => FieldValue::Boolean(*i != 0),
        (FieldType::Date, Value::Text(s)) => {
            FieldValue::Date(NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| invalid(&value))?)
        }
        (FieldType::DateTime, Value::Text(s)) => FieldValue::DateTime(
            NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT).map_err(|_| invalid(&value))?,
        ),
        (FieldType::BelongsTo { target, .. }, Value::Integer(id)) => {
            FieldValue::BelongsTo(EntityRef::new(target.clone(), *id))
        }
        _ => return Err(invalid(&value)),
    };
    Ok(Some(converted))
}

/// 字段类型 -> 列定义
fn column_definition(field: &FieldDefinition) -> String {
    let column = quote_identifier(&column_name(field));
    match field.field_type() {
        FieldType::Integer | FieldType::Priority { .. } | FieldType::Boolean => {
            format!("{} INTEGER", column)
        }
        FieldType::BelongsTo { target, .. } => format!(
            "{} INTEGER REFERENCES {}(id)",
            column,
            quote_identifier(&table_name(target))
        ),
        _ => format!("{} TEXT", column),
    }
}

impl EntityStore for SqliteEntityStore {
    fn ensure_schema(&self, definition: &DataDefinition) -> RepositoryResult<()> {
        let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        columns.extend(definition.stored_fields().map(column_definition));
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&table_name(definition.reference())),
            columns.join(", ")
        );
        let conn = self.get_conn()?;
        conn.execute_batch(&sql)?;
        info!(model = %definition.reference(), "数据表已就绪");
        Ok(())
    }

    fn get(&self, definition: &DataDefinition, id: i64) -> RepositoryResult<Option<Entity>> {
        let sql = format!("{} WHERE {}.id = ?1", Self::select_clause(definition), ALIAS);
        let width = definition.stored_fields().count() + 1;
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(&sql, [id], |row| {
                (0..width).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<Value>>>()
            })
            .optional()?;
        raw.map(|raw| Self::map_row(definition, raw)).transpose()
    }

    fn insert(&self, definition: &DataDefinition, entity: &Entity) -> RepositoryResult<i64> {
        let fields: Vec<&FieldDefinition> = definition.stored_fields().collect();
        let table = quote_identifier(&table_name(definition.reference()));
        let sql = if fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            let columns: Vec<String> = fields.iter().map(|f| quote_identifier(&column_name(f))).collect();
            let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        let params: Vec<Value> = fields
            .iter()
            .map(|f| entity.field(f.name()).map(to_sql).unwrap_or(Value::Null))
            .collect();

        let conn = self.get_conn()?;
        conn.execute(&sql, params_from_iter(params.iter()))?;
        let id = conn.last_insert_rowid();
        debug!(model = %definition.reference(), id, "插入记录");
        Ok(id)
    }

    fn update(&self, definition: &DataDefinition, entity: &Entity) -> RepositoryResult<()> {
        let id = entity.id().ok_or_else(|| {
            RepositoryError::InternalError(format!("更新 {} 时实体缺少ID", definition.reference()))
        })?;
        let fields: Vec<&FieldDefinition> = definition.stored_fields().collect();
        if fields.is_empty() {
            return Ok(());
        }
        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", quote_identifier(&column_name(f)), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            quote_identifier(&table_name(definition.reference())),
            assignments.join(", "),
            fields.len() + 1
        );
        let mut params: Vec<Value> = fields
            .iter()
            .map(|f| entity.field(f.name()).map(to_sql).unwrap_or(Value::Null))
            .collect();
        params.push(Value::Integer(id));

        let conn = self.get_conn()?;
        let affected = conn.execute(&sql, params_from_iter(params.iter()))?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: definition.reference().to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete(&self, definition: &DataDefinition, id: i64) -> RepositoryResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE id = ?1",
            quote_identifier(&table_name(definition.reference()))
        );
        let conn = self.get_conn()?;
        let affected = conn.execute(&sql, [id])?;
        Ok(affected > 0)
    }

    fn search(
        &self,
        definition: &Arc<DataDefinition>,
        criteria: &SearchCriteria,
    ) -> RepositoryResult<SearchResult> {
        let mut builder = SqlQueryBuilder::new(&Self::select_clause(definition));
        let mut params: Vec<Value> = Vec::new();

        for restriction in criteria.restrictions() {
            builder = self.apply_restriction(definition, restriction, builder, &mut params)?;
        }

        let order_clause = match criteria.order() {
            Some(order) => {
                let (expr, field_type, next) = self.column_expr(definition, &order.field, builder)?;
                builder = next;
                let expr = if field_type == FieldType::Decimal {
                    format!("CAST({} AS REAL)", expr)
                } else {
                    expr
                };
                let direction = match order.direction {
                    OrderDirection::Asc => "ASC",
                    OrderDirection::Desc => "DESC",
                };
                format!("{} {}, {}.id ASC", expr, direction, ALIAS)
            }
            None => format!("{}.id ASC", ALIAS),
        };

        let count_sql = builder.build_count(&format!(
            "SELECT COUNT(*) FROM {} {}",
            quote_identifier(&table_name(definition.reference())),
            ALIAS
        ));
        let limit = i64::try_from(criteria.max_results()).unwrap_or(-1);
        let offset = i64::try_from(criteria.first_result()).unwrap_or(i64::MAX);
        let sql = builder.order_by(&order_clause).limit(limit).offset(offset).build();

        let conn = self.get_conn()?;
        let total: i64 = conn.query_row(&count_sql, params_from_iter(params.iter()), |row| row.get(0))?;
        let entities = Self::query_entities(&conn, definition, &sql, &params)?;

        debug!(sql = %sql, total, returned = entities.len(), "SQLite 查询");
        Ok(SearchResult::new(entities, usize::try_from(total).unwrap_or(0)))
    }
}
