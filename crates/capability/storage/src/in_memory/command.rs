//! 命令队列内存实现
//!
//! 用于测试与本地演示。订阅者只收到订阅之后插入的命令，以及此前被放回的命令。

use crate::error::StorageError;
use crate::models::CommandRecord;
use crate::traits::{CommandQueueStore, CommandSubscription};
use domain::{CancelReason, CommandOutcome, CommandRequest};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// 命令队列内存存储
pub struct InMemoryCommandQueue {
    commands: RwLock<HashMap<String, CommandRecord>>,
    subscribers: RwLock<Vec<(u32, mpsc::UnboundedSender<CommandRequest>)>>,
    /// 放回时没有订阅者，等待下一次订阅
    requeued: RwLock<Vec<CommandRequest>>,
}

impl InMemoryCommandQueue {
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(Vec::new()),
            requeued: RwLock::new(Vec::new()),
        }
    }

    /// 当前存活的订阅数量（用于测试）
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .write()
            .map(|mut subscribers| {
                subscribers.retain(|(_, sender)| !sender.is_closed());
                subscribers.len()
            })
            .unwrap_or(0)
    }

    fn set_outcome(&self, command_id: &str, outcome: CommandOutcome) -> Result<(), StorageError> {
        let mut commands = self
            .commands
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let record = commands
            .get_mut(command_id)
            .ok_or_else(|| StorageError::new(format!("command not found: {}", command_id)))?;
        record.outcome = Some(outcome);
        Ok(())
    }
}

impl Default for InMemoryCommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CommandQueueStore for InMemoryCommandQueue {
    async fn insert_command(
        &self,
        mut request: CommandRequest,
    ) -> Result<CommandRequest, StorageError> {
        if request.command_id.is_empty() {
            request.command_id = uuid::Uuid::new_v4().to_string();
        }
        {
            let mut commands = self
                .commands
                .write()
                .map_err(|_| StorageError::new("lock failed"))?;
            commands.insert(
                request.command_id.clone(),
                CommandRecord {
                    request: request.clone(),
                    outcome: None,
                },
            );
        }
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        subscribers.retain(|(connection_number, sender)| {
            if *connection_number != request.connection_number {
                return !sender.is_closed();
            }
            sender.send(request.clone()).is_ok()
        });
        Ok(request)
    }

    async fn find_command(&self, command_id: &str) -> Result<Option<CommandRecord>, StorageError> {
        let commands = self
            .commands
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(commands.get(command_id).cloned())
    }

    async fn subscribe_inserts(
        &self,
        connection_number: u32,
    ) -> Result<CommandSubscription, StorageError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut requeued = self
            .requeued
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        requeued.retain(|request| {
            if request.connection_number != connection_number {
                return true;
            }
            sender.send(request.clone()).is_err()
        });
        subscribers.push((connection_number, sender));
        Ok(receiver)
    }

    async fn requeue_command(&self, request: &CommandRequest) -> Result<(), StorageError> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let delivered = subscribers.iter().any(|(connection_number, sender)| {
            *connection_number == request.connection_number && sender.send(request.clone()).is_ok()
        });
        drop(subscribers);
        if !delivered {
            self.requeued
                .write()
                .map_err(|_| StorageError::new("lock failed"))?
                .push(request.clone());
        }
        Ok(())
    }

    async fn mark_delivered(&self, command_id: &str, ack_at_ms: i64) -> Result<(), StorageError> {
        self.set_outcome(command_id, CommandOutcome::Delivered { ack_at_ms })
    }

    async fn mark_cancelled(
        &self,
        command_id: &str,
        reason: CancelReason,
    ) -> Result<(), StorageError> {
        self.set_outcome(command_id, CommandOutcome::Cancelled(reason))
    }
}
