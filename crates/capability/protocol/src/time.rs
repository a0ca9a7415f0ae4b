//! CP24Time2a / CP56Time2a 源时标还原

use crate::error::ProtocolError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike};

const HOUR_MS: i64 = 60 * 60 * 1000;
const HALF_HOUR_MS: i64 = HOUR_MS / 2;

/// 还原后的源时标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTime {
    /// 绝对时间（毫秒）；日历字段非法时为 None
    pub epoch_ms: Option<i64>,
    /// 源时标品质（IV 位清零且时间可还原）
    pub ok: bool,
}

/// 由分钟数构造源时标所在时区
pub fn source_offset(minutes: i32) -> Result<FixedOffset, ProtocolError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or(ProtocolError::InvalidOffset(minutes))
}

/// 解码 7 字节 CP56Time2a：毫秒(2) | 分钟 | 小时 | 日 | 月 | 年(2000 起)
pub fn decode_cp56(bytes: &[u8], offset: FixedOffset) -> Result<SourceTime, ProtocolError> {
    if bytes.len() < 7 {
        return Err(ProtocolError::Truncated {
            expected: 7,
            actual: bytes.len(),
        });
    }
    let millis = u16::from_le_bytes([bytes[0], bytes[1]]);
    let invalid = bytes[2] & 0x80 == 0x80;
    let minute = u32::from(bytes[2] & 0x3F);
    let hour = u32::from(bytes[3] & 0x1F);
    let day = u32::from(bytes[4] & 0x1F);
    let month = u32::from(bytes[5] & 0x0F);
    let year = 2000 + i32::from(bytes[6] & 0x7F);

    let epoch_ms = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .and_then(|naive| with_millis(naive, millis))
        .and_then(|naive| to_epoch_ms(naive, offset));
    Ok(SourceTime {
        epoch_ms,
        ok: !invalid && epoch_ms.is_some(),
    })
}

/// 解码 3 字节 CP24Time2a：毫秒(2) | 分钟
///
/// 日期与小时取自接收时间；还原结果与接收时间相差半小时以上时，
/// 视为跨越了整点，按上一小时或下一小时修正。
pub fn decode_cp24(
    bytes: &[u8],
    reference_ms: i64,
    offset: FixedOffset,
) -> Result<SourceTime, ProtocolError> {
    if bytes.len() < 3 {
        return Err(ProtocolError::Truncated {
            expected: 3,
            actual: bytes.len(),
        });
    }
    let millis = u16::from_le_bytes([bytes[0], bytes[1]]);
    let invalid = bytes[2] & 0x80 == 0x80;
    let minute = u32::from(bytes[2] & 0x3F);

    let epoch_ms = DateTime::from_timestamp_millis(reference_ms)
        .map(|reference| reference.with_timezone(&offset).naive_local())
        .and_then(|reference| reference.with_minute(minute))
        .and_then(|naive| naive.with_second(0))
        .and_then(|naive| naive.with_nanosecond(0))
        .and_then(|naive| with_millis(naive, millis))
        .and_then(|naive| to_epoch_ms(naive, offset))
        .map(|ms| {
            if ms - reference_ms > HALF_HOUR_MS {
                ms - HOUR_MS
            } else if reference_ms - ms > HALF_HOUR_MS {
                ms + HOUR_MS
            } else {
                ms
            }
        });
    Ok(SourceTime {
        epoch_ms,
        ok: !invalid && epoch_ms.is_some(),
    })
}

fn with_millis(naive: NaiveDateTime, millis: u16) -> Option<NaiveDateTime> {
    if millis >= 60_000 {
        return None;
    }
    naive.checked_add_signed(Duration::milliseconds(i64::from(millis)))
}

fn to_epoch_ms(naive: NaiveDateTime, offset: FixedOffset) -> Option<i64> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|datetime| datetime.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        source_offset(0).expect("offset")
    }

    #[test]
    fn cp56_reconstructs_absolute_time() {
        // 2024-03-15 10:25:42.123
        let bytes = [0x8B, 0xA4, 25, 10, 15, 3, 24];
        let time = decode_cp56(&bytes, utc()).expect("decoded");
        assert!(time.ok);
        assert_eq!(time.epoch_ms, Some(1_710_498_342_123));
    }

    #[test]
    fn cp56_invalid_bit_keeps_time_but_clears_quality() {
        let bytes = [0x8B, 0xA4, 25 | 0x80, 10, 15, 3, 24];
        let time = decode_cp56(&bytes, utc()).expect("decoded");
        assert!(!time.ok);
        assert_eq!(time.epoch_ms, Some(1_710_498_342_123));
    }

    #[test]
    fn cp56_impossible_date_has_no_time() {
        let bytes = [0x00, 0x00, 0, 0, 0, 13, 24];
        let time = decode_cp56(&bytes, utc()).expect("decoded");
        assert!(!time.ok);
        assert!(time.epoch_ms.is_none());
    }

    #[test]
    fn cp56_applies_configured_offset() {
        let bytes = [0x8B, 0xA4, 25, 10, 15, 3, 24];
        let offset = source_offset(-180).expect("offset");
        let time = decode_cp56(&bytes, offset).expect("decoded");
        assert_eq!(time.epoch_ms, Some(1_710_498_342_123 + 3 * 3_600_000));
    }

    #[test]
    fn cp24_takes_date_and_hour_from_reference() {
        // 接收时间 2024-03-15 10:26:00.000，源时标 25:42.123
        let reference = 1_710_498_360_000;
        let bytes = [0x8B, 0xA4, 25];
        let time = decode_cp24(&bytes, reference, utc()).expect("decoded");
        assert!(time.ok);
        assert_eq!(time.epoch_ms, Some(1_710_498_342_123));
    }

    #[test]
    fn cp24_rolls_back_across_hour_boundary() {
        // 接收时间 2024-03-15 11:00:01.000，源时标 59:59.000 应属于 10 点
        let reference = 1_710_500_401_000;
        let bytes = 59_000u16.to_le_bytes();
        let time = decode_cp24(&[bytes[0], bytes[1], 59], reference, utc()).expect("decoded");
        assert_eq!(time.epoch_ms, Some(1_710_500_399_000));
    }

    #[test]
    fn cp24_rolls_forward_across_hour_boundary() {
        // 接收时间 2024-03-15 10:59:59.900，源时钟略快，源时标 00:00.100 应属于 11 点
        let reference = 1_710_500_399_900;
        let bytes = 100u16.to_le_bytes();
        let time = decode_cp24(&[bytes[0], bytes[1], 0], reference, utc()).expect("decoded");
        assert_eq!(time.epoch_ms, Some(1_710_500_400_100));
        assert_eq!(time.epoch_ms.map(|ms| ms - reference), Some(200));
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(decode_cp56(&[0; 6], utc()).is_err());
        assert!(decode_cp24(&[0; 2], 0, utc()).is_err());
    }

    #[test]
    fn offset_out_of_range_is_rejected() {
        assert!(source_offset(24 * 60).is_err());
    }
}
