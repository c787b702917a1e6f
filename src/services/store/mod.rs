//! Record store module
//!
//! 服务记录的持久化抽象及其实现：
//! - `memory`: 基于 DashMap 的内存存储
//! - `sqlite`: 基于 SQLite 的持久化存储

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::services::registry::types::{NewServiceRecord, ServiceChanges, ServiceRecord};

/// 存储层错误类型
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("service not found: {0}")]
    NotFound(i64),
    #[error("service with name {name:?} and endpoint {endpoint:?} already exists")]
    UniquenessConflict { name: String, endpoint: String },
    #[error("record store is unavailable")]
    Unavailable,
    #[error("corrupt service record {id}: {reason}")]
    Corrupt { id: i64, reason: String },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("failed to prepare store location: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::UniquenessConflict { .. })
    }
}

/// 服务记录存储
///
/// 唯一性约束（name + endpoint）和单条写入的原子性由实现负责，
/// 注册中心本身不做任何加锁。
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// 创建记录并返回新分配的 ID
    async fn create(&self, record: NewServiceRecord) -> Result<i64, StoreError>;

    async fn get(&self, id: i64) -> Result<ServiceRecord, StoreError>;

    /// 按创建时间倒序返回全部记录
    async fn list(&self) -> Result<Vec<ServiceRecord>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// 覆盖写入全部可变字段，并把 last_heartbeat / updated_at 推进到当前时间
    async fn update(&self, id: i64, changes: ServiceChanges) -> Result<(), StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// 存储自身的存活探测
    async fn ping(&self) -> Result<(), StoreError>;
}
