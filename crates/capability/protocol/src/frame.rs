//! I104M 遥测帧识别

use crate::error::ProtocolError;
use crate::types::PayloadKind;

/// 多点帧签名
pub const MULTI_POINT_SIGNATURE: u32 = 0x6464_6464;
/// 单点帧签名
pub const SINGLE_POINT_SIGNATURE: u32 = 0x5353_5353;
/// 命令帧签名
pub const COMMAND_SIGNATURE: u32 = 0x4b4b_4b4b;
/// 遥测帧固定头长度（7 个 u32）
pub const HEADER_LEN: usize = 28;

/// 帧头公共字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub asdu: u32,
    pub primary_address: u32,
    pub secondary_address: u32,
    pub cause: u32,
    pub info_size: u32,
}

/// 已识别的遥测帧（借用原始报文）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    MultiPoint {
        header: FrameHeader,
        count: u32,
        records: &'a [u8],
    },
    SinglePoint {
        header: FrameHeader,
        object_address: u32,
        payload: &'a [u8],
    },
    /// 签名未知（含命令帧回环），调用方忽略
    Unknown(u32),
}

/// 多点帧中的一条信息对象
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InformationObject<'a> {
    pub object_address: u32,
    pub payload: &'a [u8],
}

/// 多点帧展开结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPointObjects<'a> {
    pub objects: Vec<InformationObject<'a>>,
    /// 帧头声明的对象数量；大于 `objects.len()` 表示报文被截断
    pub declared: u32,
}

impl MultiPointObjects<'_> {
    pub fn is_truncated(&self) -> bool {
        (self.objects.len() as u64) < u64::from(self.declared)
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// 识别遥测帧
///
/// 不足 4 字节无法读取签名；多点/单点帧不足固定头长度时返回 `Truncated`。
pub fn parse_frame(datagram: &[u8]) -> Result<Frame<'_>, ProtocolError> {
    if datagram.len() < 4 {
        return Err(ProtocolError::Truncated {
            expected: 4,
            actual: datagram.len(),
        });
    }
    let signature = read_u32(datagram, 0);
    if signature != MULTI_POINT_SIGNATURE && signature != SINGLE_POINT_SIGNATURE {
        return Ok(Frame::Unknown(signature));
    }
    if datagram.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            expected: HEADER_LEN,
            actual: datagram.len(),
        });
    }

    let second = read_u32(datagram, 4);
    let header = FrameHeader {
        asdu: read_u32(datagram, 8),
        primary_address: read_u32(datagram, 12),
        secondary_address: read_u32(datagram, 16),
        cause: read_u32(datagram, 20),
        info_size: read_u32(datagram, 24),
    };
    let body = &datagram[HEADER_LEN..];

    if signature == MULTI_POINT_SIGNATURE {
        Ok(Frame::MultiPoint {
            header,
            count: second,
            records: body,
        })
    } else {
        Ok(Frame::SinglePoint {
            header,
            object_address: second,
            payload: body,
        })
    }
}

/// 按 ASDU 步长展开多点帧记录
///
/// 未知 ASDU 或命令确认没有步长，整帧无法展开。声明数量超过实际记录时
/// 只返回完整的记录。
pub fn multi_point_objects(
    count: u32,
    asdu: u32,
    records: &[u8],
) -> Result<MultiPointObjects<'_>, ProtocolError> {
    let stride = PayloadKind::from_asdu(asdu)
        .and_then(|kind| kind.record_stride())
        .ok_or(ProtocolError::UnsupportedAsdu(asdu))?;

    let objects = records
        .chunks_exact(stride)
        .take(count as usize)
        .map(|record| InformationObject {
            object_address: read_u32(record, 0),
            payload: &record[4..],
        })
        .collect();

    Ok(MultiPointObjects {
        objects,
        declared: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(signature: u32, second: u32, asdu: u32, cause: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        for field in [signature, second, asdu, 1, 0, cause, 0] {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn multi_point_frame_exposes_records() {
        let mut datagram = header_bytes(MULTI_POINT_SIGNATURE, 2, 13, 3);
        for (address, value) in [(100u32, 1.5f32), (101, -2.0)] {
            datagram.extend_from_slice(&address.to_le_bytes());
            datagram.extend_from_slice(&value.to_le_bytes());
            datagram.push(0x00);
        }

        let frame = parse_frame(&datagram).expect("frame");
        let Frame::MultiPoint {
            header,
            count,
            records,
        } = frame
        else {
            panic!("expected multi point frame");
        };
        assert_eq!(count, 2);
        assert_eq!(header.asdu, 13);
        assert_eq!(header.cause, 3);
        assert_eq!(header.primary_address, 1);

        let expanded = multi_point_objects(count, header.asdu, records).expect("objects");
        assert!(!expanded.is_truncated());
        let addresses: Vec<u32> = expanded.objects.iter().map(|o| o.object_address).collect();
        assert_eq!(addresses, vec![100, 101]);
        assert_eq!(&expanded.objects[1].payload[..4], &(-2.0f32).to_le_bytes()[..]);
    }

    #[test]
    fn single_point_frame_keeps_payload_after_header() {
        let mut datagram = header_bytes(SINGLE_POINT_SIGNATURE, 1, 1, 3);
        datagram.push(0x01);

        let frame = parse_frame(&datagram).expect("frame");
        assert_eq!(
            frame,
            Frame::SinglePoint {
                header: FrameHeader {
                    asdu: 1,
                    primary_address: 1,
                    secondary_address: 0,
                    cause: 3,
                    info_size: 0,
                },
                object_address: 1,
                payload: &[0x01],
            }
        );
    }

    #[test]
    fn command_signature_is_not_telemetry() {
        let datagram = header_bytes(COMMAND_SIGNATURE, 1, 45, 6);
        assert_eq!(parse_frame(&datagram).expect("frame"), Frame::Unknown(COMMAND_SIGNATURE));
    }

    #[test]
    fn short_header_is_truncated() {
        let datagram = header_bytes(SINGLE_POINT_SIGNATURE, 1, 1, 3);
        assert!(matches!(
            parse_frame(&datagram[..20]),
            Err(ProtocolError::Truncated { expected: HEADER_LEN, actual: 20 })
        ));
        assert!(parse_frame(&[0x64, 0x64]).is_err());
    }

    #[test]
    fn declared_count_larger_than_records_is_truncated() {
        let mut records = Vec::new();
        records.extend_from_slice(&7u32.to_le_bytes());
        records.push(0x01);
        records.extend_from_slice(&8u32.to_le_bytes());

        let expanded = multi_point_objects(3, 1, &records).expect("objects");
        assert_eq!(expanded.objects.len(), 1);
        assert_eq!(expanded.objects[0].object_address, 7);
        assert!(expanded.is_truncated());
    }

    #[test]
    fn command_ack_and_unknown_asdu_cannot_be_expanded() {
        assert!(matches!(
            multi_point_objects(1, 45, &[0; 16]),
            Err(ProtocolError::UnsupportedAsdu(45))
        ));
        assert!(matches!(
            multi_point_objects(1, 99, &[0; 16]),
            Err(ProtocolError::UnsupportedAsdu(99))
        ));
    }
}
