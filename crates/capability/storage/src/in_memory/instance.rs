//! 实例记录内存实现
//!
//! 用于测试与本地演示；`set_available(false)` 模拟存储不可达。

use crate::error::StorageError;
use crate::traits::{InstanceStore, StoreHealth};
use domain::{ConnectionConfig, InstanceState};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// 实例与连接内存存储
pub struct InMemoryInstanceStore {
    instances: RwLock<HashMap<(String, u32), InstanceState>>,
    connections: RwLock<HashMap<(String, u32), ConnectionConfig>>,
    available: AtomicBool,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn put_instance(&self, state: InstanceState) -> Result<(), StorageError> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        instances.insert((state.driver.clone(), state.instance_number), state);
        Ok(())
    }

    pub fn put_connection(
        &self,
        driver: &str,
        instance_number: u32,
        connection: ConnectionConfig,
    ) -> Result<(), StorageError> {
        let mut connections = self
            .connections
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        connections.insert((driver.to_string(), instance_number), connection);
        Ok(())
    }

    pub fn remove_instance(&self, driver: &str, instance_number: u32) -> Result<(), StorageError> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        instances.remove(&(driver.to_string(), instance_number));
        Ok(())
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StorageError::new("store unavailable"))
        }
    }
}

impl Default for InMemoryInstanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn find_instance(
        &self,
        driver: &str,
        instance_number: u32,
    ) -> Result<Option<InstanceState>, StorageError> {
        self.ensure_available()?;
        let instances = self
            .instances
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(instances
            .get(&(driver.to_string(), instance_number))
            .cloned())
    }

    async fn find_connection(
        &self,
        driver: &str,
        instance_number: u32,
    ) -> Result<Option<ConnectionConfig>, StorageError> {
        self.ensure_available()?;
        let connections = self
            .connections
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(connections
            .get(&(driver.to_string(), instance_number))
            .cloned())
    }

    async fn update_active_node(
        &self,
        driver: &str,
        instance_number: u32,
        node_name: &str,
        keep_alive_ms: i64,
    ) -> Result<(), StorageError> {
        self.ensure_available()?;
        let mut instances = self
            .instances
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let state = instances
            .get_mut(&(driver.to_string(), instance_number))
            .ok_or_else(|| StorageError::new("instance not found"))?;
        state.active_node_name = node_name.to_string();
        state.active_node_keep_alive_ms = keep_alive_ms;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreHealth for InMemoryInstanceStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.ensure_available()
    }
}
