//! 冗余错误类型定义

/// 冗余仲裁错误（均为致命错误）
#[derive(Debug, thiserror::Error)]
pub enum RedundancyError {
    /// 本节点不在实例的可运行节点列表中（或实例记录不存在）
    #[error("node {0} is not eligible for this instance")]
    NotEligible(String),
}
