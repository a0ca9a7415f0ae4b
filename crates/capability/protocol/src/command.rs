//! I104M 命令帧编码

use crate::error::ProtocolError;
use crate::frame::COMMAND_SIGNATURE;
use domain::CommandRequest;

/// 命令帧长度（7 个 u32）
pub const COMMAND_FRAME_LEN: usize = 28;

/// 下发给前置机的命令帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    pub object_address: u32,
    pub asdu: u32,
    pub value: u32,
    pub select_before_operate: bool,
    pub duration: u32,
    pub common_address: u32,
}

fn field(name: &'static str, value: i64) -> Result<u32, ProtocolError> {
    u32::try_from(value).map_err(|_| ProtocolError::FieldRange(name, value.to_string()))
}

impl CommandFrame {
    /// 由命令请求构造命令帧
    ///
    /// 值向零截断，负数按补码写入；地址、ASDU、持续时间必须落在 u32 范围内。
    pub fn from_request(request: &CommandRequest) -> Result<Self, ProtocolError> {
        if !request.value.is_finite() {
            return Err(ProtocolError::FieldRange("value", request.value.to_string()));
        }
        Ok(Self {
            object_address: field("object_address", request.object_address)?,
            asdu: field("asdu", request.asdu)?,
            value: request.value.trunc() as i64 as u32,
            select_before_operate: request.use_sbo,
            duration: field("duration", request.duration)?,
            common_address: field("common_address", request.common_address)?,
        })
    }

    pub fn encode(&self) -> [u8; COMMAND_FRAME_LEN] {
        let fields = [
            COMMAND_SIGNATURE,
            self.object_address,
            self.asdu,
            self.value,
            u32::from(self.select_before_operate),
            self.duration,
            self.common_address,
        ];
        let mut frame = [0u8; COMMAND_FRAME_LEN];
        for (slot, field) in frame.chunks_exact_mut(4).zip(fields) {
            slot.copy_from_slice(&field.to_le_bytes());
        }
        frame
    }

    /// 解析命令帧（前置机侧与测试使用）
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < COMMAND_FRAME_LEN {
            return Err(ProtocolError::Truncated {
                expected: COMMAND_FRAME_LEN,
                actual: bytes.len(),
            });
        }
        let word = |index: usize| {
            let offset = index * 4;
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        let signature = word(0);
        if signature != COMMAND_SIGNATURE {
            return Err(ProtocolError::Signature(signature));
        }
        Ok(Self {
            object_address: word(1),
            asdu: word(2),
            value: word(3),
            select_before_operate: word(4) != 0,
            duration: word(5),
            common_address: word(6),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: f64) -> CommandRequest {
        CommandRequest {
            command_id: "cmd-1".to_string(),
            connection_number: 61,
            common_address: 1,
            object_address: 6001,
            asdu: 45,
            duration: 0,
            use_sbo: true,
            value,
            created_at_ms: 0,
            point_key: 0,
            tag: String::new(),
            value_string: String::new(),
            originator_user_name: String::new(),
            originator_ip_address: String::new(),
        }
    }

    #[test]
    fn encodes_little_endian_words() {
        let frame = CommandFrame::from_request(&request(1.0)).expect("frame");
        let bytes = frame.encode();
        assert_eq!(&bytes[..4], &[0x4b; 4]);
        assert_eq!(&bytes[4..8], &6001u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &45u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &1u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &1u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &0u32.to_le_bytes());
        assert_eq!(&bytes[24..28], &1u32.to_le_bytes());
        assert_eq!(CommandFrame::decode(&bytes).expect("decode"), frame);
    }

    #[test]
    fn value_truncates_toward_zero_and_wraps_negatives() {
        assert_eq!(CommandFrame::from_request(&request(2.9)).expect("frame").value, 2);
        assert_eq!(
            CommandFrame::from_request(&request(-1.0)).expect("frame").value,
            u32::MAX
        );
        assert!(CommandFrame::from_request(&request(f64::NAN)).is_err());
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut negative = request(1.0);
        negative.object_address = -5;
        assert!(matches!(
            CommandFrame::from_request(&negative),
            Err(ProtocolError::FieldRange("object_address", _))
        ));

        let mut huge = request(1.0);
        huge.common_address = i64::from(u32::MAX) + 1;
        assert!(CommandFrame::from_request(&huge).is_err());
    }

    #[test]
    fn decode_rejects_foreign_signature() {
        let mut bytes = CommandFrame::from_request(&request(0.0)).expect("frame").encode();
        bytes[0] = 0x53;
        assert!(matches!(
            CommandFrame::decode(&bytes),
            Err(ProtocolError::Signature(_))
        ));
        assert!(CommandFrame::decode(&bytes[..10]).is_err());
    }
}
