// ==========================================
// 制造执行系统 - 插件状态仓储
// ==========================================
// 职责: 管理 plugin_state 表 (按插件标识)
// 说明: 持久化插件版本与状态，启动时由插件管理器恢复
// ==========================================

use crate::db::open_sqlite_connection;
use crate::plugin::state::PluginState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 插件状态记录
#[derive(Debug, Clone, PartialEq)]
pub struct PluginStateRecord {
    pub identifier: String, // 插件标识
    pub version: String,    // 插件版本
    pub state: PluginState, // 插件状态
    pub updated_at: String, // 更新时间
}

pub struct PluginStateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PluginStateRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_table()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 确保表存在（如果不存在则创建）
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS plugin_state (
              identifier TEXT PRIMARY KEY,
              version TEXT NOT NULL,
              state TEXT NOT NULL,
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn to_record(raw: (String, String, String, String)) -> RepositoryResult<PluginStateRecord> {
        let (identifier, version, state, updated_at) = raw;
        let state = PluginState::parse(&state).ok_or_else(|| RepositoryError::FieldValueError {
            field: "state".to_string(),
            message: format!("插件 {} 的状态无效: {}", identifier, state),
        })?;
        Ok(PluginStateRecord {
            identifier,
            version,
            state,
            updated_at,
        })
    }

    /// 保存插件状态（Upsert 操作）
    pub fn save(&self, identifier: &str, version: &str, state: PluginState) -> RepositoryResult<()> {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO plugin_state (identifier, version, state, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(identifier) DO UPDATE SET
                version = excluded.version,
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
            params![identifier, version, state.as_str(), now],
        )?;
        Ok(())
    }

    pub fn find(&self, identifier: &str) -> RepositoryResult<Option<PluginStateRecord>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                "SELECT identifier, version, state, updated_at FROM plugin_state WHERE identifier = ?1",
                params![identifier],
                Self::map_row,
            )
            .optional()?;
        raw.map(Self::to_record).transpose()
    }

    /// 全部插件状态（按标识排序）
    pub fn list(&self) -> RepositoryResult<Vec<PluginStateRecord>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT identifier, version, state, updated_at FROM plugin_state ORDER BY identifier")?;
        let rows = stmt.query_map([], Self::map_row)?;
        let records = rows
            .map(|raw| Self::to_record(raw?))
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(records)
    }

    pub fn delete(&self, identifier: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM plugin_state WHERE identifier = ?1", params![identifier])?;
        Ok(affected > 0)
    }
}
