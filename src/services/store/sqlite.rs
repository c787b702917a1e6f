use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, params};
use tokio_rusqlite::Connection;

use super::{RecordStore, StoreError};
use crate::services::registry::types::{
    NewServiceRecord, ServiceChanges, ServiceRecord, ServiceType, advance_timestamp, now,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS services (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        name           TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 255),
        endpoint       TEXT NOT NULL CHECK (length(endpoint) BETWEEN 1 AND 500),
        type           TEXT NOT NULL DEFAULT 'SERVICE_TYPE_UNSPECIFIED',
        status         TEXT NOT NULL DEFAULT 'active' CHECK (length(status) <= 50),
        last_heartbeat TEXT NOT NULL,
        created_at     TEXT NOT NULL,
        updated_at     TEXT NOT NULL,
        UNIQUE (name, endpoint)
    );
    CREATE INDEX IF NOT EXISTS idx_services_type ON services (type);
    CREATE INDEX IF NOT EXISTS idx_services_status ON services (status);
    CREATE INDEX IF NOT EXISTS idx_services_last_heartbeat ON services (last_heartbeat);
    CREATE INDEX IF NOT EXISTS idx_services_type_status ON services (type, status);
";

const SELECT_COLUMNS: &str =
    "SELECT id, name, endpoint, type, status, last_heartbeat, created_at, updated_at FROM services";

/// SQLite 持久化存储
///
/// 打开时自动建表；`AUTOINCREMENT` 保证删除后的 ID 不会被复用，
/// `UNIQUE (name, endpoint)` 保证并发注册同一组合时只有一个成功。
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// 从数据库行读出的原始字段，解析在闭包外完成
struct RawRecord {
    id: i64,
    name: String,
    endpoint: String,
    service_type: String,
    status: String,
    last_heartbeat: String,
    created_at: String,
    updated_at: String,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            endpoint: row.get(2)?,
            service_type: row.get(3)?,
            status: row.get(4)?,
            last_heartbeat: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TryFrom<RawRecord> for ServiceRecord {
    type Error = StoreError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let id = raw.id;
        let corrupt = |reason: String| StoreError::Corrupt { id, reason };

        Ok(Self {
            id,
            service_type: raw
                .service_type
                .parse::<ServiceType>()
                .map_err(|e| corrupt(e.to_string()))?,
            last_heartbeat: parse_timestamp(&raw.last_heartbeat)
                .map_err(|e| corrupt(format!("last_heartbeat: {e}")))?,
            created_at: parse_timestamp(&raw.created_at)
                .map_err(|e| corrupt(format!("created_at: {e}")))?,
            updated_at: parse_timestamp(&raw.updated_at)
                .map_err(|e| corrupt(format!("updated_at: {e}")))?,
            name: raw.name,
            endpoint: raw.endpoint,
            status: raw.status,
        })
    }
}

fn format_timestamp(stamp: DateTime<Utc>) -> String {
    stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|stamp| stamp.with_timezone(&Utc))
}

fn is_unique_violation(error: &tokio_rusqlite::Error) -> bool {
    matches!(
        error,
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _))
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl SqliteStore {
    /// 打开（或创建）数据库文件并初始化表结构
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(&path).await?;
        conn.call(|conn: &mut rusqlite::Connection| {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await?;

        let store = Self { conn, path };
        store.create_schema().await?;
        tracing::info!(path = %store.path.display(), "SQLite record store ready");
        Ok(store)
    }

    /// 仅存在于内存中的数据库，进程退出即丢失
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.create_schema().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn create_schema(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn: &mut rusqlite::Connection| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create(&self, record: NewServiceRecord) -> Result<i64, StoreError> {
        let name = record.name.clone();
        let endpoint = record.endpoint.clone();
        let created_at = format_timestamp(now());

        let result = self
            .conn
            .call(move |conn: &mut rusqlite::Connection| {
                conn.execute(
                    "INSERT INTO services (name, endpoint, type, status, last_heartbeat, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![
                        record.name,
                        record.endpoint,
                        record.service_type.as_str(),
                        record.status,
                        format_timestamp(record.last_heartbeat),
                        created_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await;

        match result {
            Ok(id) => Ok(id),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::UniquenessConflict { name, endpoint })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: i64) -> Result<ServiceRecord, StoreError> {
        let raw = self
            .conn
            .call(move |conn: &mut rusqlite::Connection| {
                let raw = conn
                    .query_row(
                        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                        params![id],
                        RawRecord::from_row,
                    )
                    .optional()?;
                Ok(raw)
            })
            .await?;

        raw.ok_or(StoreError::NotFound(id))?.try_into()
    }

    async fn list(&self) -> Result<Vec<ServiceRecord>, StoreError> {
        let rows = self
            .conn
            .call(|conn: &mut rusqlite::Connection| {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))?;
                let rows = stmt
                    .query_map([], RawRecord::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(ServiceRecord::try_from).collect()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let count = self
            .conn
            .call(|conn: &mut rusqlite::Connection| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM services", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn update(&self, id: i64, changes: ServiceChanges) -> Result<(), StoreError> {
        let name = changes.name.clone();
        let endpoint = changes.endpoint.clone();

        let result = self
            .conn
            .call(move |conn: &mut rusqlite::Connection| {
                let tx = conn.transaction()?;
                let current: Option<(String, String)> = tx
                    .query_row(
                        "SELECT last_heartbeat, updated_at FROM services WHERE id = ?1",
                        params![id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let Some((last_heartbeat, updated_at)) = current else {
                    return Ok(false);
                };

                let previous = parse_timestamp(&last_heartbeat)
                    .and_then(|hb| parse_timestamp(&updated_at).map(|up| hb.max(up)))
                    .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
                let stamp = format_timestamp(advance_timestamp(previous));

                tx.execute(
                    "UPDATE services
                     SET status = ?1, name = ?2, endpoint = ?3, type = ?4,
                         last_heartbeat = ?5, updated_at = ?5
                     WHERE id = ?6",
                    params![
                        changes.status,
                        changes.name,
                        changes.endpoint,
                        changes.service_type.as_str(),
                        stamp,
                        id,
                    ],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await;

        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::NotFound(id)),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::UniquenessConflict { name, endpoint })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .call(move |conn: &mut rusqlite::Connection| {
                Ok(conn.execute("DELETE FROM services WHERE id = ?1", params![id])?)
            })
            .await?;

        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn: &mut rusqlite::Connection| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
