//! 命令帧发送器

use async_trait::async_trait;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// 单个目的地的发送失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransmitError {
    /// 目的地址无法解析
    #[error("resolve {0} failed: {1}")]
    Resolve(String, String),
    /// 写 UDP 失败
    #[error("send to {0} failed: {1}")]
    Send(String, String),
}

/// 命令帧发送器抽象。
#[async_trait]
pub trait FrameTransmitter: Send + Sync {
    async fn send_to(&self, frame: &[u8], destination: &str) -> Result<(), TransmitError>;
}

/// 经由接收套接字发送命令帧（前置机按来源端口回送）
#[derive(Clone)]
pub struct UdpTransmitter {
    socket: Arc<UdpSocket>,
}

impl UdpTransmitter {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl FrameTransmitter for UdpTransmitter {
    async fn send_to(&self, frame: &[u8], destination: &str) -> Result<(), TransmitError> {
        let resolve_error =
            |message: String| TransmitError::Resolve(destination.to_string(), message);
        let address = tokio::net::lookup_host(destination)
            .await
            .map_err(|err| resolve_error(err.to_string()))?
            .next()
            .ok_or_else(|| resolve_error("no address".to_string()))?;
        self.socket
            .send_to(frame, address)
            .await
            .map_err(|err| TransmitError::Send(destination.to_string(), err.to_string()))?;
        Ok(())
    }
}
