//! 单条命令的处理：过期 → 编码 → 逐个目的地发送 → 回写终态

use crate::ControlError;
use crate::transmitter::{FrameTransmitter, TransmitError};
use domain::{CancelReason, CommandOutcome, CommandRequest};
use i104m_protocol::CommandFrame;
use i104m_storage::CommandQueueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 命令下发配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub connection_number: u32,
    /// 按顺序尝试的目的地
    pub destinations: Vec<String>,
    /// 命令最大年龄，超过即取消
    pub max_age: Duration,
}

/// 命令下发器
pub struct CommandDispatcher {
    store: Arc<dyn CommandQueueStore>,
    transmitter: Arc<dyn FrameTransmitter>,
    config: DispatcherConfig,
}

impl CommandDispatcher {
    pub fn new(
        store: Arc<dyn CommandQueueStore>,
        transmitter: Arc<dyn FrameTransmitter>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            transmitter,
            config,
        }
    }

    pub fn connection_number(&self) -> u32 {
        self.config.connection_number
    }

    pub(crate) fn store(&self) -> &Arc<dyn CommandQueueStore> {
        &self.store
    }

    /// 处理一条命令并回写终态
    pub async fn process(
        &self,
        request: &CommandRequest,
        now_ms: i64,
    ) -> Result<CommandOutcome, ControlError> {
        i104m_telemetry::record_command_received();
        info!(
            target: "i104m.control",
            command_id = %request.command_id,
            connection_number = request.connection_number,
            tag = %request.tag,
            value = request.value,
            originator = %request.originator_user_name,
            "command_received"
        );

        let outcome = self.resolve(request, now_ms).await;
        match outcome {
            CommandOutcome::Delivered { ack_at_ms } => {
                i104m_telemetry::record_command_delivered();
                self.store
                    .mark_delivered(&request.command_id, ack_at_ms)
                    .await
                    .map_err(|err| ControlError::Storage(err.to_string()))?;
            }
            CommandOutcome::Cancelled(reason) => {
                i104m_telemetry::record_command_cancelled();
                warn!(
                    target: "i104m.control",
                    command_id = %request.command_id,
                    reason = %reason,
                    "command_cancelled"
                );
                self.store
                    .mark_cancelled(&request.command_id, reason)
                    .await
                    .map_err(|err| ControlError::Storage(err.to_string()))?;
            }
        }
        Ok(outcome)
    }

    /// 计算命令终态（不写存储）
    pub async fn resolve(&self, request: &CommandRequest, now_ms: i64) -> CommandOutcome {
        let age_ms = now_ms.saturating_sub(request.created_at_ms);
        if age_ms > self.config.max_age.as_millis() as i64 {
            info!(target: "i104m.control", command_id = %request.command_id, age_ms, "command_expired");
            return CommandOutcome::Cancelled(CancelReason::Expired);
        }

        let frame = match CommandFrame::from_request(request) {
            Ok(frame) => frame.encode(),
            Err(err) => {
                warn!(target: "i104m.control", command_id = %request.command_id, error = %err, "command_encode_failed");
                return CommandOutcome::Cancelled(CancelReason::BufferWriteError);
            }
        };

        let mut last_reason = CancelReason::NoIpDestination;
        let mut delivered = false;
        for destination in &self.config.destinations {
            let destination = destination.trim();
            if destination.is_empty() {
                last_reason = CancelReason::NoIpDestination;
                continue;
            }
            match self.transmitter.send_to(&frame, destination).await {
                Ok(()) => {
                    info!(target: "i104m.control", command_id = %request.command_id, destination, "command_sent");
                    delivered = true;
                }
                Err(err) => {
                    warn!(target: "i104m.control", command_id = %request.command_id, error = %err, "command_send_failed");
                    last_reason = match err {
                        TransmitError::Resolve(..) => CancelReason::IpAddressError,
                        TransmitError::Send(..) => CancelReason::UdpSendError,
                    };
                }
            }
        }

        if delivered {
            CommandOutcome::Delivered {
                ack_at_ms: domain::now_epoch_ms(),
            }
        } else {
            CommandOutcome::Cancelled(last_reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use i104m_storage::InMemoryCommandQueue;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 按目的地返回预设结果，并记录调用顺序
    #[derive(Default)]
    struct ScriptedTransmitter {
        results: HashMap<String, Result<(), TransmitError>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransmitter {
        fn with(mut self, destination: &str, result: Result<(), TransmitError>) -> Self {
            self.results.insert(destination.to_string(), result);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls").clone()
        }
    }

    #[async_trait]
    impl FrameTransmitter for ScriptedTransmitter {
        async fn send_to(&self, frame: &[u8], destination: &str) -> Result<(), TransmitError> {
            assert_eq!(frame.len(), 28);
            self.calls.lock().expect("calls").push(destination.to_string());
            self.results
                .get(destination)
                .cloned()
                .unwrap_or_else(|| Err(TransmitError::Send(destination.to_string(), "unscripted".to_string())))
        }
    }

    fn request(created_at_ms: i64) -> CommandRequest {
        CommandRequest {
            command_id: "cmd-1".to_string(),
            connection_number: 61,
            common_address: 1,
            object_address: 6001,
            asdu: 45,
            duration: 0,
            use_sbo: false,
            value: 1.0,
            created_at_ms,
            point_key: 0,
            tag: "breaker".to_string(),
            value_string: String::new(),
            originator_user_name: String::new(),
            originator_ip_address: String::new(),
        }
    }

    fn dispatcher(
        transmitter: Arc<ScriptedTransmitter>,
        destinations: &[&str],
    ) -> CommandDispatcher {
        CommandDispatcher::new(
            Arc::new(InMemoryCommandQueue::new()),
            transmitter,
            DispatcherConfig {
                connection_number: 61,
                destinations: destinations.iter().map(|d| d.to_string()).collect(),
                max_age: Duration::from_secs(10),
            },
        )
    }

    fn resolve_error(destination: &str) -> Result<(), TransmitError> {
        Err(TransmitError::Resolve(destination.to_string(), "bad".to_string()))
    }

    #[tokio::test]
    async fn old_command_is_expired_without_sending() {
        let transmitter = Arc::new(ScriptedTransmitter::default().with("a:1", Ok(())));
        let dispatcher = dispatcher(transmitter.clone(), &["a:1"]);
        let outcome = dispatcher.resolve(&request(0), 10_001).await;
        assert_eq!(outcome, CommandOutcome::Cancelled(CancelReason::Expired));
        assert!(transmitter.calls().is_empty());

        let outcome = dispatcher.resolve(&request(0), 10_000).await;
        assert!(outcome.is_delivered());
    }

    #[tokio::test]
    async fn one_reachable_destination_delivers() {
        let transmitter = Arc::new(
            ScriptedTransmitter::default()
                .with("bad:1", resolve_error("bad:1"))
                .with("good:1", Ok(())),
        );
        let dispatcher = dispatcher(transmitter.clone(), &["bad:1", "good:1"]);
        let outcome = dispatcher.resolve(&request(5_000), 5_000).await;
        assert!(outcome.is_delivered());
        assert_eq!(transmitter.calls(), vec!["bad:1", "good:1"]);
    }

    #[tokio::test]
    async fn all_failures_report_last_reason() {
        let transmitter = Arc::new(
            ScriptedTransmitter::default()
                .with("bad:1", resolve_error("bad:1"))
                .with(
                    "down:1",
                    Err(TransmitError::Send("down:1".to_string(), "refused".to_string())),
                ),
        );
        let dispatcher = dispatcher(transmitter.clone(), &["bad:1", "down:1"]);
        assert_eq!(
            dispatcher.resolve(&request(0), 0).await,
            CommandOutcome::Cancelled(CancelReason::UdpSendError)
        );

        let dispatcher = self::dispatcher(transmitter, &["down:1", " ", "bad:1"]);
        assert_eq!(
            dispatcher.resolve(&request(0), 0).await,
            CommandOutcome::Cancelled(CancelReason::IpAddressError)
        );
    }

    #[tokio::test]
    async fn blank_or_missing_destinations_cancel() {
        let transmitter = Arc::new(ScriptedTransmitter::default());
        let dispatcher = dispatcher(transmitter.clone(), &["  "]);
        assert_eq!(
            dispatcher.resolve(&request(0), 0).await,
            CommandOutcome::Cancelled(CancelReason::NoIpDestination)
        );
        let dispatcher = self::dispatcher(transmitter.clone(), &[]);
        assert_eq!(
            dispatcher.resolve(&request(0), 0).await,
            CommandOutcome::Cancelled(CancelReason::NoIpDestination)
        );
        assert!(transmitter.calls().is_empty());
    }

    #[tokio::test]
    async fn unencodable_command_is_buffer_write_error() {
        let transmitter = Arc::new(ScriptedTransmitter::default().with("a:1", Ok(())));
        let dispatcher = dispatcher(transmitter.clone(), &["a:1"]);
        let mut request = request(0);
        request.object_address = -1;
        assert_eq!(
            dispatcher.resolve(&request, 0).await,
            CommandOutcome::Cancelled(CancelReason::BufferWriteError)
        );
        assert!(transmitter.calls().is_empty());
    }
}
