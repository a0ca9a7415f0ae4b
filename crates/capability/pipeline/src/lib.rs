//! # I104M 报文处理
//!
//! 每个出队报文按签名分派：
//! - 多点帧：按 ASDU 步长展开全部记录，解码结果合并为一次无序批量写入
//! - 单点帧：与上一单点帧逐字节比较，重复则丢弃；否则解码并单独写入
//! - 其它签名：忽略
//!
//! 写入失败向上返回，由调用方终止进程。

use chrono::FixedOffset;
use domain::PointUpdate;
use i104m_protocol::{
    DecodeContext, Frame, FrameHeader, ProtocolError, decode_object, multi_point_objects,
    parse_frame,
};
use i104m_storage::{PointUpdateSink, StorageError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pipeline 处理错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("bulk write failed: {0}")]
    Sink(#[from] StorageError),
}

/// 报文被忽略的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownSignature(u32),
    UnsupportedAsdu(u32),
    Truncated,
}

/// 单个报文的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// 已写入的点数（一次批量写入）
    Written(usize),
    /// 帧有效但没有可写入的对象
    NoUpdates,
    /// 与上一单点帧相同
    Duplicate,
    Ignored(IgnoreReason),
}

/// 报文处理器（单任务持有）
pub struct FrameProcessor {
    connection_number: u32,
    sink: Arc<dyn PointUpdateSink>,
    source_offset: FixedOffset,
    previous_single: Option<Vec<u8>>,
}

impl FrameProcessor {
    pub fn new(
        connection_number: u32,
        sink: Arc<dyn PointUpdateSink>,
        source_offset: FixedOffset,
    ) -> Self {
        Self {
            connection_number,
            sink,
            source_offset,
            previous_single: None,
        }
    }

    pub async fn process(
        &mut self,
        datagram: &[u8],
        received_at_ms: i64,
    ) -> Result<FrameOutcome, PipelineError> {
        let ctx = DecodeContext::new(received_at_ms, self.source_offset);
        let frame = match parse_frame(datagram) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(target: "i104m.pipeline", error = %err, "frame_truncated");
                i104m_telemetry::record_ignored_frame();
                return Ok(FrameOutcome::Ignored(IgnoreReason::Truncated));
            }
        };

        match frame {
            Frame::MultiPoint {
                header,
                count,
                records,
            } => {
                i104m_telemetry::record_multi_point_frame();
                self.process_multi_point(&header, count, records, &ctx).await
            }
            Frame::SinglePoint {
                header,
                object_address,
                payload,
            } => {
                if self.previous_single.as_deref() == Some(datagram) {
                    debug!(target: "i104m.pipeline", object_address, "duplicate_single_point_frame");
                    i104m_telemetry::record_duplicate_frame();
                    return Ok(FrameOutcome::Duplicate);
                }
                i104m_telemetry::record_single_point_frame();
                let outcome = self
                    .process_single_point(&header, object_address, payload, &ctx)
                    .await;
                self.previous_single = Some(datagram.to_vec());
                outcome
            }
            Frame::Unknown(signature) => {
                debug!(target: "i104m.pipeline", signature, "unknown_signature");
                i104m_telemetry::record_ignored_frame();
                Ok(FrameOutcome::Ignored(IgnoreReason::UnknownSignature(
                    signature,
                )))
            }
        }
    }

    async fn process_multi_point(
        &self,
        header: &FrameHeader,
        count: u32,
        records: &[u8],
        ctx: &DecodeContext,
    ) -> Result<FrameOutcome, PipelineError> {
        debug!(
            target: "i104m.pipeline",
            count,
            asdu = header.asdu,
            primary_address = header.primary_address,
            secondary_address = header.secondary_address,
            cause = header.cause,
            info_size = header.info_size,
            "multi_point_frame"
        );
        let expanded = match multi_point_objects(count, header.asdu, records) {
            Ok(expanded) => expanded,
            Err(ProtocolError::UnsupportedAsdu(asdu)) => {
                debug!(target: "i104m.pipeline", asdu, "multi_point_asdu_unsupported");
                i104m_telemetry::record_ignored_frame();
                return Ok(FrameOutcome::Ignored(IgnoreReason::UnsupportedAsdu(asdu)));
            }
            Err(err) => {
                warn!(target: "i104m.pipeline", error = %err, "multi_point_frame_invalid");
                i104m_telemetry::record_ignored_frame();
                return Ok(FrameOutcome::Ignored(IgnoreReason::Truncated));
            }
        };
        if expanded.is_truncated() {
            warn!(
                target: "i104m.pipeline",
                declared = expanded.declared,
                present = expanded.objects.len(),
                "multi_point_frame_truncated"
            );
        }

        let updates: Vec<PointUpdate> = expanded
            .objects
            .iter()
            .filter_map(|object| {
                decode_object(
                    object.payload,
                    object.object_address,
                    header.asdu,
                    header.cause,
                    ctx,
                )
            })
            .collect();
        self.write(&updates).await
    }

    async fn process_single_point(
        &self,
        header: &FrameHeader,
        object_address: u32,
        payload: &[u8],
        ctx: &DecodeContext,
    ) -> Result<FrameOutcome, PipelineError> {
        debug!(
            target: "i104m.pipeline",
            object_address,
            asdu = header.asdu,
            cause = header.cause,
            "single_point_frame"
        );
        let updates: Vec<PointUpdate> =
            decode_object(payload, object_address, header.asdu, header.cause, ctx)
                .into_iter()
                .collect();
        self.write(&updates).await
    }

    async fn write(&self, updates: &[PointUpdate]) -> Result<FrameOutcome, PipelineError> {
        if updates.is_empty() {
            return Ok(FrameOutcome::NoUpdates);
        }
        let started = Instant::now();
        self.sink
            .bulk_upsert(self.connection_number, updates)
            .await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        i104m_telemetry::record_points_decoded(updates.len() as u64);
        i104m_telemetry::record_bulk_write(elapsed_ms);
        if updates.len() > 10 {
            info!(
                target: "i104m.pipeline",
                points = updates.len(),
                elapsed_ms,
                "bulk_write_completed"
            );
        } else {
            debug!(
                target: "i104m.pipeline",
                points = updates.len(),
                elapsed_ms,
                "bulk_write_completed"
            );
        }
        Ok(FrameOutcome::Written(updates.len()))
    }
}
