//! 进程内激活标志
//!
//! 单写多读：写端 [`ActivityFlag`] 只由冗余控制器持有，
//! 读端 [`ActivityHandle`] 可克隆给接收任务与命令任务。

use tokio::sync::watch;

/// 激活标志写端
#[derive(Debug)]
pub struct ActivityFlag {
    sender: watch::Sender<bool>,
}

/// 激活标志读端
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    receiver: watch::Receiver<bool>,
}

impl ActivityFlag {
    /// 初始为非激活（备用）
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub(crate) fn set(&self, active: bool) {
        self.sender.send_replace(active);
    }

    pub fn is_active(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn handle(&self) -> ActivityHandle {
        ActivityHandle {
            receiver: self.sender.subscribe(),
        }
    }
}

impl ActivityHandle {
    pub fn is_active(&self) -> bool {
        *self.receiver.borrow()
    }

    /// 等待标志变为指定状态（已是该状态时立即返回）
    ///
    /// 写端被丢弃时返回 false。
    pub async fn wait_for(&mut self, active: bool) -> bool {
        self.receiver.wait_for(|value| *value == active).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handles_observe_writer_changes() {
        let flag = ActivityFlag::new();
        let mut handle = flag.handle();
        assert!(!handle.is_active());

        flag.set(true);
        assert!(handle.wait_for(true).await);
        assert!(handle.clone().is_active());
        assert!(flag.is_active());
    }

    #[tokio::test]
    async fn dropped_writer_ends_waiting() {
        let flag = ActivityFlag::new();
        let mut handle = flag.handle();
        drop(flag);
        assert!(!handle.wait_for(true).await);
    }
}
