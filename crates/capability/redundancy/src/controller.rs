//! 主备冗余控制器
//!
//! 每个轮询周期读取一次实例记录：
//! - 记录中的活动节点为本节点 → 激活
//! - 否则若之前激活 → 立即转为备用，清零计数并暂停
//! - 备用时心跳时间戳与上次相同 → 计数加一，超过阈值 → 激活
//! - 激活时写回本节点名与新心跳

use crate::error::RedundancyError;
use crate::flag::{ActivityFlag, ActivityHandle};
use i104m_storage::InstanceStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 节点角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Active,
    Standby,
}

/// 冗余控制器配置
#[derive(Debug, Clone)]
pub struct RedundancyConfig {
    pub driver: String,
    pub instance_number: u32,
    pub node_name: String,
    /// 连续未更新心跳次数上限，超过即接管
    pub missed_limit: u32,
    /// 降级后的暂停时间
    pub demotion_pause: Duration,
}

impl RedundancyConfig {
    pub fn new(driver: impl Into<String>, instance_number: u32, node_name: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            instance_number,
            node_name: node_name.into(),
            missed_limit: 4,
            demotion_pause: Duration::from_secs(1),
        }
    }
}

/// 冗余控制器（激活标志的唯一写者）
pub struct RedundancyController {
    store: Arc<dyn InstanceStore>,
    config: RedundancyConfig,
    flag: ActivityFlag,
    missed: u32,
    last_keep_alive_ms: Option<i64>,
}

impl RedundancyController {
    pub fn new(store: Arc<dyn InstanceStore>, config: RedundancyConfig) -> Self {
        Self {
            store,
            config,
            flag: ActivityFlag::new(),
            missed: 0,
            last_keep_alive_ms: None,
        }
    }

    pub fn handle(&self) -> ActivityHandle {
        self.flag.handle()
    }

    pub fn role(&self) -> Role {
        if self.flag.is_active() {
            Role::Active
        } else {
            Role::Standby
        }
    }

    /// 当前连续未更新心跳次数
    pub fn missed_keep_alives(&self) -> u32 {
        self.missed
    }

    /// 执行一次仲裁
    ///
    /// 读取失败时保持当前角色；本节点不可运行时返回致命错误。
    pub async fn poll(&mut self, now_ms: i64) -> Result<Role, RedundancyError> {
        let node_name = self.config.node_name.clone();

        let state = match self
            .store
            .find_instance(&self.config.driver, self.config.instance_number)
            .await
        {
            Ok(Some(state)) => state,
            Ok(None) => {
                warn!(target: "i104m.redundancy", instance = self.config.instance_number, "instance_missing");
                return Err(RedundancyError::NotEligible(node_name));
            }
            Err(err) => {
                warn!(target: "i104m.redundancy", error = %err, "instance_read_failed");
                return Ok(self.role());
            }
        };

        if !state.is_eligible(&node_name) {
            return Err(RedundancyError::NotEligible(node_name));
        }

        if state.is_held_by(&node_name) {
            self.promote("record_names_local_node");
        } else {
            if self.flag.is_active() {
                info!(
                    target: "i104m.redundancy",
                    active_node = %state.active_node_name,
                    "redundancy_deactivated"
                );
                self.flag.set(false);
                self.missed = 0;
                i104m_telemetry::record_demotion();
                tokio::time::sleep(self.config.demotion_pause).await;
            }
            if self.last_keep_alive_ms == Some(state.active_node_keep_alive_ms) {
                self.missed += 1;
            } else {
                self.missed = 0;
            }
            self.last_keep_alive_ms = Some(state.active_node_keep_alive_ms);
            debug!(
                target: "i104m.redundancy",
                active_node = %state.active_node_name,
                missed = self.missed,
                "keep_alive_checked"
            );
            if self.missed > self.config.missed_limit {
                self.promote("keep_alive_expired");
            }
        }

        if self.flag.is_active() {
            if let Err(err) = self
                .store
                .update_active_node(
                    &self.config.driver,
                    self.config.instance_number,
                    &node_name,
                    now_ms,
                )
                .await
            {
                warn!(target: "i104m.redundancy", error = %err, "keep_alive_write_failed");
            }
        }

        Ok(self.role())
    }

    fn promote(&mut self, reason: &'static str) {
        if !self.flag.is_active() {
            info!(target: "i104m.redundancy", reason, "redundancy_activated");
            self.flag.set(true);
            i104m_telemetry::record_promotion();
        }
        self.missed = 0;
    }
}
