//! Redis 存储实现
//!
//! 键布局（`prefix` 可配置）：
//!
//! - `{prefix}:instance:{driver}:{n}` hash：`document`、`active_node_name`、`active_node_keep_alive_ms`
//! - `{prefix}:connection:{driver}:{n}` string：连接配置 JSON
//! - `{prefix}:realtime:{connection}:{object}` string：实时值 JSON
//! - `{prefix}:command:{id}` hash：`document` + 结果字段
//! - `{prefix}:commands:inserted:{connection}` list：新插入命令 ID（LPUSH 入队，BRPOP 出队）

use crate::error::StorageError;
use crate::models::{
    CommandDocument, CommandRecord, ConnectionDocument, InstanceDocument, PointDocument,
};
use crate::traits::{
    CommandQueueStore, CommandSubscription, InstanceStore, PointUpdateSink, StoreHealth,
};
use domain::{CancelReason, CommandOutcome, CommandRequest, ConnectionConfig, InstanceState, PointUpdate};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const DOCUMENT_FIELD: &str = "document";
const ACTIVE_NODE_NAME_FIELD: &str = "active_node_name";
const ACTIVE_NODE_KEEP_ALIVE_FIELD: &str = "active_node_keep_alive_ms";
const DELIVERED_FIELD: &str = "delivered";
const ACK_FIELD: &str = "ack";
const ACK_TIME_FIELD: &str = "ack_time_ms";
const CANCEL_REASON_FIELD: &str = "cancel_reason";

/// BRPOP 阻塞超时（秒），到期后检查订阅是否已取消
const SUBSCRIPTION_POLL_SECONDS: u64 = 1;

/// Redis 存储（实现全部存储接口）
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
}

impl RedisStore {
    pub fn new(client: redis::Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    pub fn connect(redis_url: &str, prefix: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client, prefix))
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }

    fn instance_key(&self, driver: &str, instance_number: u32) -> String {
        format!("{}:instance:{}:{}", self.prefix, driver, instance_number)
    }

    fn connection_key(&self, driver: &str, instance_number: u32) -> String {
        format!("{}:connection:{}:{}", self.prefix, driver, instance_number)
    }

    fn realtime_key(&self, connection_number: u32, object_address: u32) -> String {
        format!(
            "{}:realtime:{}:{}",
            self.prefix, connection_number, object_address
        )
    }

    fn command_key(&self, command_id: &str) -> String {
        format!("{}:command:{}", self.prefix, command_id)
    }

    fn inserted_key(&self, connection_number: u32) -> String {
        format!("{}:commands:inserted:{}", self.prefix, connection_number)
    }
}

fn parse_outcome(fields: &HashMap<String, String>) -> Option<CommandOutcome> {
    if fields.get(DELIVERED_FIELD).map(String::as_str) == Some("true") {
        let ack_at_ms = fields
            .get(ACK_TIME_FIELD)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();
        return Some(CommandOutcome::Delivered { ack_at_ms });
    }
    fields
        .get(CANCEL_REASON_FIELD)
        .and_then(|reason| CancelReason::parse(reason))
        .map(CommandOutcome::Cancelled)
}

#[async_trait::async_trait]
impl PointUpdateSink for RedisStore {
    async fn bulk_upsert(
        &self,
        connection_number: u32,
        updates: &[PointUpdate],
    ) -> Result<(), StorageError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for update in updates {
            let document = PointDocument::from_update(connection_number, update);
            pipe.set(
                self.realtime_key(connection_number, update.object_address),
                serde_json::to_string(&document)?,
            )
            .ignore();
        }
        let mut connection = self.connection().await?;
        pipe.query_async::<_, ()>(&mut connection).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CommandQueueStore for RedisStore {
    async fn insert_command(
        &self,
        mut request: CommandRequest,
    ) -> Result<CommandRequest, StorageError> {
        if request.command_id.is_empty() {
            request.command_id = uuid::Uuid::new_v4().to_string();
        }
        let document = serde_json::to_string(&CommandDocument::from(&request))?;
        let mut connection = self.connection().await?;
        redis::pipe()
            .atomic()
            .hset(self.command_key(&request.command_id), DOCUMENT_FIELD, document)
            .ignore()
            .lpush(
                self.inserted_key(request.connection_number),
                &request.command_id,
            )
            .ignore()
            .query_async::<_, ()>(&mut connection)
            .await?;
        Ok(request)
    }

    async fn find_command(&self, command_id: &str) -> Result<Option<CommandRecord>, StorageError> {
        let mut connection = self.connection().await?;
        let fields: HashMap<String, String> =
            connection.hgetall(self.command_key(command_id)).await?;
        let Some(document) = fields.get(DOCUMENT_FIELD) else {
            return Ok(None);
        };
        let document: CommandDocument = serde_json::from_str(document)?;
        Ok(Some(CommandRecord {
            request: document.into(),
            outcome: parse_outcome(&fields),
        }))
    }

    async fn subscribe_inserts(
        &self,
        connection_number: u32,
    ) -> Result<CommandSubscription, StorageError> {
        // 阻塞弹出需要独占连接
        let mut connection = self.connection().await?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let store = self.clone();
        let list_key = self.inserted_key(connection_number);

        tokio::spawn(async move {
            while !sender.is_closed() {
                let popped: Option<(String, String)> = match redis::cmd("BRPOP")
                    .arg(&list_key)
                    .arg(SUBSCRIPTION_POLL_SECONDS)
                    .query_async(&mut connection)
                    .await
                {
                    Ok(popped) => popped,
                    Err(err) => {
                        warn!(target: "i104m.storage", error = %err, "command_subscription_failed");
                        break;
                    }
                };
                let Some((_, command_id)) = popped else {
                    continue;
                };
                let record = match store.find_command(&command_id).await {
                    Ok(Some(record)) => record,
                    Ok(None) => {
                        debug!(target: "i104m.storage", command_id = %command_id, "command_document_missing");
                        continue;
                    }
                    Err(err) => {
                        warn!(target: "i104m.storage", command_id = %command_id, error = %err, "command_document_invalid");
                        continue;
                    }
                };
                if sender.send(record.request).is_err() {
                    // 订阅已取消，把 ID 放回出队端等待下一次订阅
                    if let Err(err) = connection
                        .rpush::<_, _, ()>(&list_key, &command_id)
                        .await
                    {
                        warn!(
                            target: "i104m.storage",
                            command_id = %command_id,
                            error = %err,
                            "command_requeue_failed"
                        );
                    }
                    break;
                }
            }
            debug!(target: "i104m.storage", connection_number, "command_subscription_closed");
        });

        Ok(receiver)
    }

    async fn requeue_command(&self, request: &CommandRequest) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        connection
            .rpush::<_, _, ()>(
                self.inserted_key(request.connection_number),
                &request.command_id,
            )
            .await?;
        Ok(())
    }

    async fn mark_delivered(&self, command_id: &str, ack_at_ms: i64) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        connection
            .hset_multiple::<_, _, _, ()>(
                self.command_key(command_id),
                &[
                    (DELIVERED_FIELD, "true".to_string()),
                    (ACK_FIELD, "true".to_string()),
                    (ACK_TIME_FIELD, ack_at_ms.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn mark_cancelled(
        &self,
        command_id: &str,
        reason: CancelReason,
    ) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        connection
            .hset::<_, _, _, ()>(
                self.command_key(command_id),
                CANCEL_REASON_FIELD,
                reason.as_str(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl InstanceStore for RedisStore {
    async fn find_instance(
        &self,
        driver: &str,
        instance_number: u32,
    ) -> Result<Option<InstanceState>, StorageError> {
        let mut connection = self.connection().await?;
        let fields: HashMap<String, String> = connection
            .hgetall(self.instance_key(driver, instance_number))
            .await?;
        let Some(document) = fields.get(DOCUMENT_FIELD) else {
            return Ok(None);
        };
        let document: InstanceDocument = serde_json::from_str(document)?;
        let active_node_name = fields
            .get(ACTIVE_NODE_NAME_FIELD)
            .cloned()
            .unwrap_or_default();
        let keep_alive_ms = fields
            .get(ACTIVE_NODE_KEEP_ALIVE_FIELD)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();
        Ok(Some(document.into_state(active_node_name, keep_alive_ms)))
    }

    async fn find_connection(
        &self,
        driver: &str,
        instance_number: u32,
    ) -> Result<Option<ConnectionConfig>, StorageError> {
        let mut connection = self.connection().await?;
        let data: Option<String> = connection
            .get(self.connection_key(driver, instance_number))
            .await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let document: ConnectionDocument = serde_json::from_str(&data)?;
        Ok(Some(document.into()))
    }

    async fn update_active_node(
        &self,
        driver: &str,
        instance_number: u32,
        node_name: &str,
        keep_alive_ms: i64,
    ) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        connection
            .hset_multiple::<_, _, _, ()>(
                self.instance_key(driver, instance_number),
                &[
                    (ACTIVE_NODE_NAME_FIELD, node_name.to_string()),
                    (ACTIVE_NODE_KEEP_ALIVE_FIELD, keep_alive_ms.to_string()),
                ],
            )
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreHealth for RedisStore {
    async fn ping(&self) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut connection)
            .await?;
        Ok(())
    }
}
