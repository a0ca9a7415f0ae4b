//! 存储接口 Trait 定义
//!
//! - PointUpdateSink：实时值批量写入
//! - CommandQueueStore：命令队列（读取、订阅新插入、放回、回写结果）
//! - InstanceStore：冗余实例记录与连接配置
//! - StoreHealth：存活探测
//!
//! 所有接口返回 StorageError，使用 async_trait 支持动态分发。

use crate::error::StorageError;
use crate::models::CommandRecord;
use async_trait::async_trait;
use domain::{CancelReason, CommandRequest, ConnectionConfig, InstanceState, PointUpdate};
use tokio::sync::mpsc;

/// 命令插入订阅：每条新插入的命令推送一次。
pub type CommandSubscription = mpsc::UnboundedReceiver<CommandRequest>;

/// 实时值写入接口
#[async_trait]
pub trait PointUpdateSink: Send + Sync {
    /// 无序批量写入，按 (连接号, 信息对象地址) 覆盖
    async fn bulk_upsert(
        &self,
        connection_number: u32,
        updates: &[PointUpdate],
    ) -> Result<(), StorageError>;
}

/// 命令队列接口
#[async_trait]
pub trait CommandQueueStore: Send + Sync {
    /// 插入命令；`command_id` 为空时由存储分配
    async fn insert_command(&self, request: CommandRequest)
    -> Result<CommandRequest, StorageError>;

    async fn find_command(&self, command_id: &str) -> Result<Option<CommandRecord>, StorageError>;

    /// 订阅指定连接此后插入的命令；丢弃接收端即取消订阅
    async fn subscribe_inserts(
        &self,
        connection_number: u32,
    ) -> Result<CommandSubscription, StorageError>;

    /// 把已推送但未处理的命令放回队列，由下一次订阅重新接收
    async fn requeue_command(&self, request: &CommandRequest) -> Result<(), StorageError>;

    /// 写入 delivered / ack / ack 时间
    async fn mark_delivered(&self, command_id: &str, ack_at_ms: i64) -> Result<(), StorageError>;

    /// 写入取消原因
    async fn mark_cancelled(
        &self,
        command_id: &str,
        reason: CancelReason,
    ) -> Result<(), StorageError>;
}

/// 冗余实例记录接口
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn find_instance(
        &self,
        driver: &str,
        instance_number: u32,
    ) -> Result<Option<InstanceState>, StorageError>;

    async fn find_connection(
        &self,
        driver: &str,
        instance_number: u32,
    ) -> Result<Option<ConnectionConfig>, StorageError>;

    /// 写入活动节点名与心跳时间
    async fn update_active_node(
        &self,
        driver: &str,
        instance_number: u32,
        node_name: &str,
        keep_alive_ms: i64,
    ) -> Result<(), StorageError>;
}

/// 存活探测
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StorageError>;
}
