//! 网关致命错误：全部上抛到 main，记录后以非零状态退出。

use i104m_config::ConfigError;
use i104m_ingest::IngestError;
use i104m_pipeline::PipelineError;
use i104m_protocol::ProtocolError;
use i104m_redundancy::RedundancyError;
use i104m_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("no enabled instance {driver} #{instance_number}")]
    InstanceNotFound { driver: String, instance_number: u32 },
    #[error("no enabled connection for {driver} #{instance_number}")]
    ConnectionNotFound { driver: String, instance_number: u32 },
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("redundancy error: {0}")]
    Redundancy(#[from] RedundancyError),
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    /// 接收任务已退出，队列被关闭
    #[error("udp receiver stopped")]
    ReceiverStopped,
}
