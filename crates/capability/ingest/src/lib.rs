//! # I104M UDP 接收
//!
//! 接收任务持续读取绑定地址上的 UDP 报文：
//! - 来源主机（忽略端口）不在对端白名单 → 丢弃
//! - 长度不超过 4 字节 → 丢弃
//! - 备用状态 → 读出但不入队
//! - 队列满 → 丢弃并记录，从不阻塞接收

use domain::now_epoch_ms;
use i104m_redundancy::ActivityHandle;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 单次接收缓冲区长度（UDP 最大载荷）
pub const RECEIVE_BUFFER_LEN: usize = 65_536;

/// 接收错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("udp bind {address} failed: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("datagram queue closed")]
    QueueClosed,
}

/// 入队的原始报文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    pub source: SocketAddr,
    pub received_at_ms: i64,
}

/// 入队结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    Dropped,
}

/// 有界报文队列发送端（满则丢弃）
#[derive(Debug, Clone)]
pub struct DatagramQueue {
    sender: mpsc::Sender<Datagram>,
}

/// 创建有界报文队列
pub fn datagram_queue(capacity: usize) -> (DatagramQueue, mpsc::Receiver<Datagram>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (DatagramQueue { sender }, receiver)
}

impl DatagramQueue {
    /// 尝试入队，不等待
    pub fn offer(&self, datagram: Datagram) -> Result<Offer, IngestError> {
        match self.sender.try_send(datagram) {
            Ok(()) => Ok(Offer::Queued),
            Err(mpsc::error::TrySendError::Full(datagram)) => {
                warn!(
                    target: "i104m.ingest",
                    source = %datagram.source,
                    len = datagram.bytes.len(),
                    "queue_full_datagram_dropped"
                );
                i104m_telemetry::record_datagram_dropped();
                Ok(Offer::Dropped)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(IngestError::QueueClosed),
        }
    }
}

/// 对端来源白名单（只比较主机部分）
#[derive(Debug, Clone, Default)]
pub struct PeerAllowList {
    addresses: Vec<IpAddr>,
    hosts: Vec<String>,
}

impl PeerAllowList {
    /// 对端可写成 `ip`、`ip:port`、`[v6]`、`[v6]:port` 或 `host:port`
    pub fn new(peers: &[String]) -> Self {
        let mut list = Self::default();
        for peer in peers {
            let peer = peer.trim();
            if peer.is_empty() {
                continue;
            }
            if let Ok(address) = peer.parse::<SocketAddr>() {
                list.addresses.push(address.ip().to_canonical());
            } else if let Ok(address) = unbracketed(peer).parse::<IpAddr>() {
                list.addresses.push(address.to_canonical());
            } else {
                let host = peer.split(':').next().unwrap_or(peer).trim();
                list.hosts.push(host.to_string());
            }
        }
        list
    }

    pub fn allows(&self, source: &SocketAddr) -> bool {
        let ip = source.ip().to_canonical();
        if self.addresses.contains(&ip) {
            return true;
        }
        let text = ip.to_string();
        self.hosts.iter().any(|host| *host == text)
    }
}

/// `[v6]` 写法去掉方括号
fn unbracketed(peer: &str) -> &str {
    peer.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(peer)
}

/// 绑定本地 UDP 地址
pub async fn bind(address: &str) -> Result<UdpSocket, IngestError> {
    UdpSocket::bind(address)
        .await
        .map_err(|source| IngestError::Bind {
            address: address.to_string(),
            source,
        })
}

/// UDP 接收任务
pub struct UdpReceiver {
    socket: Arc<UdpSocket>,
    allow_list: PeerAllowList,
    queue: DatagramQueue,
    activity: ActivityHandle,
}

impl UdpReceiver {
    pub fn new(
        socket: Arc<UdpSocket>,
        allow_list: PeerAllowList,
        queue: DatagramQueue,
        activity: ActivityHandle,
    ) -> Self {
        Self {
            socket,
            allow_list,
            queue,
            activity,
        }
    }

    /// 运行接收循环，直到处理端关闭队列
    pub async fn run(self) -> Result<(), IngestError> {
        let local = self
            .socket
            .local_addr()
            .map(|address| address.to_string())
            .unwrap_or_default();
        info!(target: "i104m.ingest", local = %local, "udp_receiver_started");

        let mut buffer = vec![0u8; RECEIVE_BUFFER_LEN];
        loop {
            let (len, source) = match self.socket.recv_from(&mut buffer).await {
                Ok(received) => received,
                Err(err) => {
                    warn!(target: "i104m.ingest", error = %err, "udp_receive_failed");
                    continue;
                }
            };
            i104m_telemetry::record_datagram_received();

            if !self.allow_list.allows(&source) {
                debug!(target: "i104m.ingest", source = %source, "source_not_allowed");
                i104m_telemetry::record_datagram_rejected();
                continue;
            }
            if len <= 4 {
                continue;
            }
            debug!(target: "i104m.ingest", source = %source, len, "datagram_received");
            if !self.activity.is_active() {
                i104m_telemetry::record_datagram_inactive();
                continue;
            }

            let datagram = Datagram {
                bytes: buffer[..len].to_vec(),
                source,
                received_at_ms: now_epoch_ms(),
            };
            self.queue.offer(datagram)?;
        }
    }
}
