//! 协议错误类型定义

/// I104M 报文错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 报文长度不足
    #[error("truncated frame: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// 不支持的 ASDU 类型（无法计算记录步长）
    #[error("unsupported asdu: {0}")]
    UnsupportedAsdu(u32),

    /// 帧签名不匹配
    #[error("unexpected signature: {0:#010x}")]
    Signature(u32),

    /// 字段超出 32 位无符号范围
    #[error("field {0} out of range: {1}")]
    FieldRange(&'static str, String),

    /// 时区偏移非法
    #[error("invalid utc offset: {0} minutes")]
    InvalidOffset(i32),
}
