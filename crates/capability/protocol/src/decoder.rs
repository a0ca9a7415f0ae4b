//! 遥测信息对象解码
//!
//! 每个 ASDU 族有固定的 payload 布局（偏移相对于值字段，小端序）：
//!
//! | ASDU | 值 | 品质字节 |
//! |---|---|---|
//! | 9, 11, 34, 35 | i16 @0 | @2 |
//! | 5, 32 | byte0 低 7 位，0x80 为暂态 | @1 |
//! | 13, 36 | f32 @0 | @4，0x01 为溢出 |
//! | 1, 2, 3, 4, 30, 31 | 品质字节本身 | @0 |
//!
//! 45/46/47 是命令确认，不产生更新。

use crate::time::{decode_cp24, decode_cp56};
use crate::types::{PayloadKind, TimeTag};
use chrono::FixedOffset;
use domain::{PointUpdate, QualityFlags};
use tracing::{debug, warn};

/// 解码上下文
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext {
    /// 本地接收时间（毫秒）
    pub received_at_ms: i64,
    /// 源时标所在时区
    pub source_offset: FixedOffset,
}

impl DecodeContext {
    pub fn new(received_at_ms: i64, source_offset: FixedOffset) -> Self {
        Self {
            received_at_ms,
            source_offset,
        }
    }
}

struct Reading {
    value: f64,
    quality: QualityFlags,
}

/// 解码单个信息对象
///
/// `payload` 定位在对象值字段起始处。ASDU 未知、为命令确认或 payload
/// 长度不足时返回 None（不是错误）。
pub fn decode_object(
    payload: &[u8],
    object_address: u32,
    asdu: u32,
    cause: u32,
    ctx: &DecodeContext,
) -> Option<PointUpdate> {
    let Some(kind) = PayloadKind::from_asdu(asdu) else {
        debug!(target: "i104m.protocol", asdu, object_address, "asdu_unsupported");
        return None;
    };
    let Some(size) = kind.payload_size() else {
        debug!(target: "i104m.protocol", asdu, object_address, "command_ack_ignored");
        return None;
    };
    if payload.len() < size {
        warn!(
            target: "i104m.protocol",
            asdu,
            object_address,
            expected = size,
            actual = payload.len(),
            "payload_truncated"
        );
        return None;
    }

    let reading = match kind {
        PayloadKind::DigitalSingle(_) => digital_single(payload),
        PayloadKind::DigitalDouble(_) => digital_double(payload),
        PayloadKind::StepPosition | PayloadKind::StepPositionTagged => step_position(payload),
        PayloadKind::NormalizedScaled | PayloadKind::NormalizedScaledTagged => {
            normalized_scaled(payload)
        }
        PayloadKind::Floating | PayloadKind::FloatingTagged => floating(payload),
        PayloadKind::CommandAck => return None,
    };

    let mut update = PointUpdate::new(object_address, asdu, cause, reading.value, ctx.received_at_ms);
    update.quality = reading.quality;

    if let PayloadKind::DigitalSingle(tag) | PayloadKind::DigitalDouble(tag) = kind {
        let time = match tag {
            TimeTag::Untagged => None,
            TimeTag::Cp24 => decode_cp24(&payload[1..4], ctx.received_at_ms, ctx.source_offset).ok(),
            TimeTag::Cp56 => decode_cp56(&payload[1..8], ctx.source_offset).ok(),
        };
        if let Some(time) = time {
            update.source_time_ms = time.epoch_ms;
            update.source_time_ok = time.ok;
        }
    }

    debug!(
        target: "i104m.protocol",
        asdu,
        object_address,
        value = update.value,
        invalid = update.quality.invalid,
        "object_decoded"
    );
    Some(update)
}

fn digital_single(payload: &[u8]) -> Reading {
    let descriptor = payload[0];
    Reading {
        value: if descriptor & 0x01 == 0x01 { 1.0 } else { 0.0 },
        quality: QualityFlags::from_descriptor(descriptor),
    }
}

fn digital_double(payload: &[u8]) -> Reading {
    let descriptor = payload[0];
    let mut quality = QualityFlags::from_descriptor(descriptor);
    // 00 与 11 为中间/不确定状态
    let state = descriptor & 0x03;
    quality.transient = state == 0x00 || state == 0x03;
    Reading {
        value: if descriptor & 0x02 == 0x02 { 1.0 } else { 0.0 },
        quality,
    }
}

fn step_position(payload: &[u8]) -> Reading {
    let mut quality = QualityFlags::from_descriptor(payload[1]);
    quality.transient = payload[0] & 0x80 == 0x80;
    Reading {
        value: f64::from(payload[0] & 0x7F),
        quality,
    }
}

fn normalized_scaled(payload: &[u8]) -> Reading {
    Reading {
        value: f64::from(i16::from_le_bytes([payload[0], payload[1]])),
        quality: QualityFlags::from_descriptor(payload[2]),
    }
}

fn floating(payload: &[u8]) -> Reading {
    let descriptor = payload[4];
    let mut quality = QualityFlags::from_descriptor(descriptor);
    quality.overflow = descriptor & 0x01 == 0x01;
    Reading {
        value: f64::from(f32::from_le_bytes([
            payload[0], payload[1], payload[2], payload[3],
        ])),
        quality,
    }
}
