/// 品质描述位。
///
/// `carry` 为保留位，解码器始终置 false，但存储侧需要该字段。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityFlags {
    pub invalid: bool,
    pub not_topical: bool,
    pub substituted: bool,
    pub blocked: bool,
    pub overflow: bool,
    pub transient: bool,
    pub carry: bool,
}

impl QualityFlags {
    /// 从品质字节高半字节提取 IV/NT/SB/BL。
    pub fn from_descriptor(descriptor: u8) -> Self {
        Self {
            invalid: descriptor & 0x80 == 0x80,
            not_topical: descriptor & 0x40 == 0x40,
            substituted: descriptor & 0x20 == 0x20,
            blocked: descriptor & 0x10 == 0x10,
            ..Self::default()
        }
    }
}

/// 解码后的点位更新。
///
/// 存储寻址键为 (连接号, 信息对象地址)，只在单个连接内唯一。
#[derive(Debug, Clone, PartialEq)]
pub struct PointUpdate {
    pub object_address: u32,
    pub asdu: u32,
    pub cause: u32,
    pub value: f64,
    pub value_string: String,
    pub quality: QualityFlags,
    /// 源时标（毫秒），报文不带时标时为 None。
    pub source_time_ms: Option<i64>,
    /// 源时标品质，无源时标时显式为 false。
    pub source_time_ok: bool,
    pub received_at_ms: i64,
}

impl PointUpdate {
    pub fn new(object_address: u32, asdu: u32, cause: u32, value: f64, received_at_ms: i64) -> Self {
        Self {
            object_address,
            asdu,
            cause,
            value,
            value_string: format!("{:.6}", value),
            quality: QualityFlags::default(),
            source_time_ms: None,
            source_time_ok: false,
            received_at_ms,
        }
    }
}
