//! # I104M 协议模块
//!
//! 上游前置机把 IEC 60870-5-104 信息对象解封装后，以私有 UDP 帧转发。
//! 本模块只处理这层 UDP 封装，不实现 T-104 会话层。
//!
//! ## 报文结构
//!
//! ```text
//! 多点帧  u32 0x64646464 | count | asdu | primary | secondary | cause | info_size | count × (u32 addr + payload)
//! 单点帧  u32 0x53535353 | addr  | asdu | primary | secondary | cause | info_size | payload
//! 命令帧  u32 0x4b4b4b4b | addr  | asdu | value   | sbo       | duration | common_address
//! ```
//!
//! 所有整数均为小端序。信息对象的 payload 布局由 [`PayloadKind`] 按 ASDU 查表确定，
//! 解码见 [`decode_object`]。

mod command;
mod decoder;
mod error;
mod frame;
mod time;
mod types;

pub use command::{COMMAND_FRAME_LEN, CommandFrame};
pub use decoder::{DecodeContext, decode_object};
pub use error::ProtocolError;
pub use frame::{
    COMMAND_SIGNATURE, Frame, FrameHeader, HEADER_LEN, InformationObject, MULTI_POINT_SIGNATURE,
    MultiPointObjects, SINGLE_POINT_SIGNATURE, multi_point_objects, parse_frame,
};
pub use time::{SourceTime, decode_cp24, decode_cp56, source_offset};
pub use types::{PayloadKind, TimeTag};
