//! ASDU 类型与 payload 布局

/// 数字量携带的时标格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeTag {
    /// 无时标
    Untagged,
    /// CP24Time2a（毫秒 + 分钟，3 字节）
    Cp24,
    /// CP56Time2a（完整日期时间，7 字节）
    Cp56,
}

impl TimeTag {
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Untagged => 0,
            Self::Cp24 => 3,
            Self::Cp56 => 7,
        }
    }
}

/// 信息对象 payload 种类（封闭集合，按 ASDU 查表）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// 单点遥信（M_SP_NA/TA/TB）
    DigitalSingle(TimeTag),
    /// 双点遥信（M_DP_NA/TA/TB）
    DigitalDouble(TimeTag),
    /// 步位置（M_ST_NA）
    StepPosition,
    /// 带长时标步位置（M_ST_TB）
    StepPositionTagged,
    /// 归一化/标度化测量值（M_ME_NA/NB）
    NormalizedScaled,
    /// 带长时标归一化/标度化测量值（M_ME_TD/TE）
    NormalizedScaledTagged,
    /// 短浮点测量值（M_ME_NC）
    Floating,
    /// 带长时标短浮点测量值（M_ME_TF）
    FloatingTagged,
    /// 命令确认/回显（C_SC/C_DC/C_RC），不是遥测
    CommandAck,
}

/// CP56Time2a 长时标字段长度
const LONG_TAG_LEN: usize = 7;

const ASDU_TABLE: [(u32, PayloadKind); 17] = [
    (1, PayloadKind::DigitalSingle(TimeTag::Untagged)),
    (2, PayloadKind::DigitalSingle(TimeTag::Cp24)),
    (3, PayloadKind::DigitalDouble(TimeTag::Untagged)),
    (4, PayloadKind::DigitalDouble(TimeTag::Cp24)),
    (5, PayloadKind::StepPosition),
    (9, PayloadKind::NormalizedScaled),
    (11, PayloadKind::NormalizedScaled),
    (13, PayloadKind::Floating),
    (30, PayloadKind::DigitalSingle(TimeTag::Cp56)),
    (31, PayloadKind::DigitalDouble(TimeTag::Cp56)),
    (32, PayloadKind::StepPositionTagged),
    (34, PayloadKind::NormalizedScaledTagged),
    (35, PayloadKind::NormalizedScaledTagged),
    (36, PayloadKind::FloatingTagged),
    (45, PayloadKind::CommandAck),
    (46, PayloadKind::CommandAck),
    (47, PayloadKind::CommandAck),
];

impl PayloadKind {
    /// 按 ASDU 类型查表
    pub fn from_asdu(asdu: u32) -> Option<Self> {
        ASDU_TABLE
            .iter()
            .find(|(code, _)| *code == asdu)
            .map(|(_, kind)| *kind)
    }

    /// payload 字节数（不含 4 字节信息对象地址）
    ///
    /// 命令确认没有固定布局，返回 None。
    pub fn payload_size(&self) -> Option<usize> {
        match self {
            Self::DigitalSingle(tag) | Self::DigitalDouble(tag) => Some(1 + tag.byte_len()),
            Self::StepPosition => Some(2),
            Self::StepPositionTagged => Some(2 + LONG_TAG_LEN),
            Self::NormalizedScaled => Some(3),
            Self::NormalizedScaledTagged => Some(3 + LONG_TAG_LEN),
            Self::Floating => Some(5),
            Self::FloatingTagged => Some(5 + LONG_TAG_LEN),
            Self::CommandAck => None,
        }
    }

    /// 多点帧中单条记录的步长（信息对象地址 + payload）
    pub fn record_stride(&self) -> Option<usize> {
        self.payload_size().map(|size| 4 + size)
    }
}
