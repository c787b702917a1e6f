use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use super::{RecordStore, StoreError};
use crate::services::registry::types::{
    NewServiceRecord, ServiceChanges, ServiceRecord, advance_timestamp, now,
};

type ServiceKey = (String, String);

/// 基于 DashMap 的内存存储
#[derive(Debug, Clone)]
pub struct MemoryStore {
    // 服务 ID -> 服务记录
    records: Arc<DashMap<i64, ServiceRecord>>,
    // (name, endpoint) -> 服务 ID，用于唯一性约束
    index: Arc<DashMap<ServiceKey, i64>>,
    next_id: Arc<AtomicI64>,
    available: Arc<AtomicBool>,
    // 串行化所有写操作，保证 records 与 index 一起变更
    writes: Arc<Mutex<()>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            index: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
            available: Arc::new(AtomicBool::new(true)),
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// 模拟存储不可达，之后所有操作都返回 `StoreError::Unavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        tracing::debug!(available, "Memory store availability changed");
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: NewServiceRecord) -> Result<i64, StoreError> {
        self.ensure_available()?;
        let _guard = self.writes.lock().await;

        let key = (record.name.clone(), record.endpoint.clone());
        match self.index.entry(key) {
            Entry::Occupied(_) => Err(StoreError::UniquenessConflict {
                name: record.name,
                endpoint: record.endpoint,
            }),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let created_at = now();
                self.records.insert(
                    id,
                    ServiceRecord {
                        id,
                        name: record.name,
                        endpoint: record.endpoint,
                        service_type: record.service_type,
                        status: record.status,
                        last_heartbeat: record.last_heartbeat,
                        created_at,
                        updated_at: created_at,
                    },
                );
                slot.insert(id);
                Ok(id)
            }
        }
    }

    async fn get(&self, id: i64) -> Result<ServiceRecord, StoreError> {
        self.ensure_available()?;
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<ServiceRecord>, StoreError> {
        self.ensure_available()?;
        let mut records: Vec<ServiceRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.ensure_available()?;
        Ok(self.records.len())
    }

    async fn update(&self, id: i64, changes: ServiceChanges) -> Result<(), StoreError> {
        self.ensure_available()?;
        let _guard = self.writes.lock().await;

        let old_key = {
            let current = self.records.get(&id).ok_or(StoreError::NotFound(id))?;
            (current.name.clone(), current.endpoint.clone())
        };
        let new_key = (changes.name.clone(), changes.endpoint.clone());

        // 先占用新的 (name, endpoint)，再释放旧的
        if new_key != old_key {
            match self.index.entry(new_key) {
                Entry::Occupied(owner) if *owner.get() != id => {
                    return Err(StoreError::UniquenessConflict {
                        name: changes.name,
                        endpoint: changes.endpoint,
                    });
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.index.remove_if(&old_key, |_, owner| *owner == id);
        }

        let mut record = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let stamp = advance_timestamp(record.last_heartbeat.max(record.updated_at));
        record.status = changes.status;
        record.name = changes.name;
        record.endpoint = changes.endpoint;
        record.service_type = changes.service_type;
        record.last_heartbeat = stamp;
        record.updated_at = stamp;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.ensure_available()?;
        let _guard = self.writes.lock().await;
        let (_, record) = self.records.remove(&id).ok_or(StoreError::NotFound(id))?;
        self.index
            .remove_if(&(record.name, record.endpoint), |_, owner| *owner == id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }
}
