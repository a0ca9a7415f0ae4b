use std::fmt;

/// 待下发命令（由外部写入命令队列）。
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub command_id: String,
    pub connection_number: u32,
    pub common_address: i64,
    pub object_address: i64,
    pub asdu: i64,
    /// 命令持续时间 / 限定词。
    pub duration: i64,
    pub use_sbo: bool,
    pub value: f64,
    pub created_at_ms: i64,
    pub point_key: i64,
    pub tag: String,
    pub value_string: String,
    pub originator_user_name: String,
    pub originator_ip_address: String,
}

/// 命令取消原因。
///
/// 字符串形式会原样写回命令队列，供上游界面展示。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Expired,
    NoIpDestination,
    IpAddressError,
    BufferWriteError,
    UdpSendError,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::NoIpDestination => "no IP destination",
            Self::IpAddressError => "IP address error",
            Self::BufferWriteError => "udp buffer write error",
            Self::UdpSendError => "UDP send error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "expired" => Some(Self::Expired),
            "no IP destination" => Some(Self::NoIpDestination),
            "IP address error" => Some(Self::IpAddressError),
            "udp buffer write error" => Some(Self::BufferWriteError),
            "UDP send error" => Some(Self::UdpSendError),
            _ => None,
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 命令终态：每条命令恰好到达其中之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Delivered { ack_at_ms: i64 },
    Cancelled(CancelReason),
}

impl CommandOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}
