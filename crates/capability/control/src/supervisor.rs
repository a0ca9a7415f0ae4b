//! 命令订阅监督任务
//!
//! 激活时打开命令订阅，降为备用时显式关闭；订阅失败后暂停 1 秒重试。
//! 关闭订阅时，已推送但未处理的命令放回队列，由下一个激活实例接收。

use crate::dispatcher::CommandDispatcher;
use domain::CommandRequest;
use i104m_redundancy::ActivityHandle;
use i104m_storage::CommandSubscription;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const RESUBSCRIBE_PAUSE: Duration = Duration::from_secs(1);

/// 启动命令订阅监督任务
///
/// 激活标志写端被丢弃时任务结束。
pub fn spawn_command_supervisor(
    dispatcher: Arc<CommandDispatcher>,
    activity: ActivityHandle,
) -> JoinHandle<()> {
    tokio::spawn(supervise(dispatcher, activity))
}

async fn supervise(dispatcher: Arc<CommandDispatcher>, mut activity: ActivityHandle) {
    let connection_number = dispatcher.connection_number();
    loop {
        if !activity.wait_for(true).await {
            return;
        }

        let mut subscription = match dispatcher.store().subscribe_inserts(connection_number).await
        {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(
                    target: "i104m.control",
                    connection_number,
                    error = %err,
                    "command_subscribe_failed"
                );
                tokio::time::sleep(RESUBSCRIBE_PAUSE).await;
                continue;
            }
        };
        info!(target: "i104m.control", connection_number, "command_subscription_opened");

        loop {
            tokio::select! {
                still_running = activity.wait_for(false) => {
                    requeue_unprocessed(&dispatcher, subscription, None).await;
                    if !still_running {
                        return;
                    }
                    break;
                }
                request = subscription.recv() => {
                    let Some(request) = request else {
                        warn!(target: "i104m.control", connection_number, "command_subscription_ended");
                        tokio::time::sleep(RESUBSCRIBE_PAUSE).await;
                        break;
                    };
                    if !activity.is_active() {
                        requeue_unprocessed(&dispatcher, subscription, Some(request)).await;
                        break;
                    }
                    if request.connection_number != connection_number {
                        debug!(
                            target: "i104m.control",
                            command_id = %request.command_id,
                            connection_number = request.connection_number,
                            "command_other_connection"
                        );
                        continue;
                    }
                    if let Err(err) = dispatcher.process(&request, domain::now_epoch_ms()).await {
                        warn!(
                            target: "i104m.control",
                            command_id = %request.command_id,
                            error = %err,
                            "command_outcome_write_failed"
                        );
                    }
                }
            }
        }

        info!(target: "i104m.control", connection_number, "command_subscription_closed");
    }
}

/// 关闭订阅，并把尚未处理的命令放回队列
async fn requeue_unprocessed(
    dispatcher: &CommandDispatcher,
    mut subscription: CommandSubscription,
    popped: Option<CommandRequest>,
) {
    subscription.close();
    let mut pending: Vec<CommandRequest> = popped.into_iter().collect();
    while let Ok(request) = subscription.try_recv() {
        pending.push(request);
    }
    drop(subscription);

    for request in pending {
        match dispatcher.store().requeue_command(&request).await {
            Ok(()) => debug!(
                target: "i104m.control",
                command_id = %request.command_id,
                "command_requeued"
            ),
            Err(err) => warn!(
                target: "i104m.control",
                command_id = %request.command_id,
                error = %err,
                "command_requeue_failed"
            ),
        }
    }
}
