//! 网关任务装配
//!
//! 启动顺序：实例与连接 → 首次冗余仲裁 → 绑定 UDP → 接收任务 → 命令任务。
//! 之后由 [`Gateway::run`] 在当前任务中处理报文，并按固定周期执行存活探测与冗余仲裁。

use crate::error::GatewayError;
use domain::{DRIVER_NAME, now_epoch_ms};
use i104m_config::GatewayConfig;
use i104m_control::{
    CommandDispatcher, DispatcherConfig, UdpTransmitter, spawn_command_supervisor,
};
use i104m_ingest::{Datagram, PeerAllowList, UdpReceiver, datagram_queue};
use i104m_pipeline::FrameProcessor;
use i104m_protocol::source_offset;
use i104m_redundancy::{RedundancyConfig, RedundancyController};
use i104m_storage::{CommandQueueStore, InstanceStore, PointUpdateSink, StoreHealth};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// 存活探测失败后的重试间隔
const PING_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// 网关使用的存储能力
#[derive(Clone)]
pub struct Stores {
    pub points: Arc<dyn PointUpdateSink>,
    pub commands: Arc<dyn CommandQueueStore>,
    pub instances: Arc<dyn InstanceStore>,
    pub health: Arc<dyn StoreHealth>,
}

/// 已启动的网关
pub struct Gateway {
    controller: RedundancyController,
    processor: FrameProcessor,
    datagrams: mpsc::Receiver<Datagram>,
    health: Arc<dyn StoreHealth>,
    housekeeping_interval: Duration,
    local_addr: SocketAddr,
    receiver_task: JoinHandle<()>,
    command_task: Option<JoinHandle<()>>,
}

impl Gateway {
    /// 读取实例与连接配置并启动后台任务
    ///
    /// 本节点不在候选节点中时，在绑定 UDP 之前返回错误。
    pub async fn start(config: &GatewayConfig, stores: Stores) -> Result<Self, GatewayError> {
        let instance = stores
            .instances
            .find_instance(DRIVER_NAME, config.instance_number)
            .await?
            .filter(|instance| instance.enabled)
            .ok_or_else(|| GatewayError::InstanceNotFound {
                driver: DRIVER_NAME.to_string(),
                instance_number: config.instance_number,
            })?;
        let connection = stores
            .instances
            .find_connection(DRIVER_NAME, config.instance_number)
            .await?
            .filter(|connection| connection.enabled)
            .ok_or_else(|| GatewayError::ConnectionNotFound {
                driver: DRIVER_NAME.to_string(),
                instance_number: config.instance_number,
            })?
            .with_defaults();
        info!(
            target: "i104m.gateway",
            instance_number = instance.instance_number,
            connection_number = connection.connection_number,
            connection_name = %connection.name,
            local = %connection.local_bind_address,
            peers = ?connection.peer_addresses,
            commands_enabled = connection.commands_enabled,
            "connection_loaded"
        );

        let mut redundancy = RedundancyConfig::new(
            DRIVER_NAME,
            config.instance_number,
            config.node_name.clone(),
        );
        redundancy.missed_limit = config.redundancy_missed_limit;
        let mut controller = RedundancyController::new(stores.instances.clone(), redundancy);
        controller.poll(now_epoch_ms()).await?;

        let offset = source_offset(config.source_utc_offset_minutes)?;
        let socket = Arc::new(i104m_ingest::bind(&connection.local_bind_address).await?);
        let local_addr = socket
            .local_addr()
            .map_err(|source| i104m_ingest::IngestError::Bind {
                address: connection.local_bind_address.clone(),
                source,
            })?;

        let (queue, datagrams) = datagram_queue(config.queue_capacity);
        let receiver = UdpReceiver::new(
            socket.clone(),
            PeerAllowList::new(&connection.peer_addresses),
            queue,
            controller.handle(),
        );
        let receiver_task = tokio::spawn(async move {
            if let Err(err) = receiver.run().await {
                warn!(target: "i104m.gateway", error = %err, "udp_receiver_stopped");
            }
        });

        let command_task = if connection.commands_enabled {
            let dispatcher = CommandDispatcher::new(
                stores.commands.clone(),
                Arc::new(UdpTransmitter::new(socket)),
                DispatcherConfig {
                    connection_number: connection.connection_number,
                    destinations: connection.peer_addresses.clone(),
                    max_age: config.command_max_age,
                },
            );
            Some(spawn_command_supervisor(
                Arc::new(dispatcher),
                controller.handle(),
            ))
        } else {
            None
        };

        info!(target: "i104m.gateway", local = %local_addr, role = ?controller.role(), "gateway_started");
        Ok(Self {
            controller,
            processor: FrameProcessor::new(connection.connection_number, stores.points, offset),
            datagrams,
            health: stores.health,
            housekeeping_interval: config.housekeeping_interval,
            local_addr,
            receiver_task,
            command_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 处理报文直到出现致命错误
    pub async fn run(mut self) -> Result<(), GatewayError> {
        let result = self.process_loop().await;
        self.receiver_task.abort();
        if let Some(task) = self.command_task.take() {
            task.abort();
        }
        result
    }

    async fn process_loop(&mut self) -> Result<(), GatewayError> {
        let mut next_housekeeping = Instant::now() + self.housekeeping_interval;
        loop {
            let wait = next_housekeeping.saturating_duration_since(Instant::now());
            match tokio::time::timeout(wait, self.datagrams.recv()).await {
                Ok(Some(datagram)) => {
                    self.processor
                        .process(&datagram.bytes, datagram.received_at_ms)
                        .await?;
                }
                Ok(None) => return Err(GatewayError::ReceiverStopped),
                Err(_) => {}
            }

            if Instant::now() >= next_housekeeping {
                self.housekeeping().await?;
                next_housekeeping = Instant::now() + self.housekeeping_interval;
            }
        }
    }

    async fn housekeeping(&mut self) -> Result<(), GatewayError> {
        while let Err(err) = self.health.ping().await {
            warn!(target: "i104m.gateway", error = %err, "store_ping_failed");
            tokio::time::sleep(PING_RETRY_PAUSE).await;
        }

        let role = self.controller.poll(now_epoch_ms()).await?;
        let snapshot = i104m_telemetry::metrics().snapshot();
        debug!(
            target: "i104m.gateway",
            role = ?role,
            missed_keep_alives = self.controller.missed_keep_alives(),
            datagrams_received = snapshot.datagrams_received,
            datagrams_rejected = snapshot.datagrams_rejected,
            datagrams_inactive = snapshot.datagrams_inactive,
            datagrams_dropped = snapshot.datagrams_dropped,
            frames_multi_point = snapshot.frames_multi_point,
            frames_single_point = snapshot.frames_single_point,
            frames_duplicate = snapshot.frames_duplicate,
            frames_ignored = snapshot.frames_ignored,
            points_decoded = snapshot.points_decoded,
            bulk_writes = snapshot.bulk_writes,
            commands_received = snapshot.commands_received,
            commands_delivered = snapshot.commands_delivered,
            commands_cancelled = snapshot.commands_cancelled,
            "housekeeping"
        );
        Ok(())
    }
}
