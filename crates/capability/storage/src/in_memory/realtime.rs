//! 实时值内存实现
//!
//! 用于测试与本地演示；记录批量写入次数，并可注入写入失败。

use crate::error::StorageError;
use crate::traits::PointUpdateSink;
use domain::PointUpdate;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// 实时值内存存储，键为 (连接号, 信息对象地址)
pub struct InMemoryPointStore {
    values: RwLock<HashMap<(u32, u32), PointUpdate>>,
    bulk_writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl InMemoryPointStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            bulk_writes: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// 已执行的批量写入次数（用于测试）
    pub fn bulk_write_count(&self) -> u64 {
        self.bulk_writes.load(Ordering::Relaxed)
    }

    /// 之后的写入全部失败（用于测试）
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn get(&self, connection_number: u32, object_address: u32) -> Option<PointUpdate> {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(&(connection_number, object_address)).cloned())
    }

    pub fn len(&self) -> usize {
        self.values.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryPointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PointUpdateSink for InMemoryPointStore {
    async fn bulk_upsert(
        &self,
        connection_number: u32,
        updates: &[PointUpdate],
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StorageError::new("bulk write rejected"));
        }
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        for update in updates {
            values.insert((connection_number, update.object_address), update.clone());
        }
        self.bulk_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
