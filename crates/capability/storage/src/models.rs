//! 数据模型
//!
//! - CommandRecord：命令及其终态（读取命令时返回）
//! - 持久化文档：InstanceDocument、ConnectionDocument、PointDocument、CommandDocument
//!   （Redis 中以 JSON 保存，字段与领域模型一一对应）

use domain::{
    CommandOutcome, CommandRequest, ConnectionConfig, InstanceState, PointUpdate, QualityFlags,
};
use serde::{Deserialize, Serialize};

/// 命令记录：请求本身 + 已写回的终态
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    pub request: CommandRequest,
    pub outcome: Option<CommandOutcome>,
}

/// 驱动实例配置文档（冗余字段单独存放）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDocument {
    pub driver: String,
    pub instance_number: u32,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub log_level: i64,
    #[serde(default)]
    pub node_names: Vec<String>,
}

impl InstanceDocument {
    pub fn into_state(self, active_node_name: String, active_node_keep_alive_ms: i64) -> InstanceState {
        InstanceState {
            driver: self.driver,
            instance_number: self.instance_number,
            enabled: self.enabled,
            log_level: self.log_level,
            node_names: self.node_names,
            active_node_name,
            active_node_keep_alive_ms,
        }
    }
}

impl From<&InstanceState> for InstanceDocument {
    fn from(state: &InstanceState) -> Self {
        Self {
            driver: state.driver.clone(),
            instance_number: state.instance_number,
            enabled: state.enabled,
            log_level: state.log_level,
            node_names: state.node_names.clone(),
        }
    }
}

/// 连接配置文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDocument {
    pub connection_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub commands_enabled: bool,
    #[serde(default)]
    pub local_bind_address: String,
    #[serde(default)]
    pub peer_addresses: Vec<String>,
}

impl From<ConnectionDocument> for ConnectionConfig {
    fn from(document: ConnectionDocument) -> Self {
        Self {
            connection_number: document.connection_number,
            name: document.name,
            description: document.description,
            enabled: document.enabled,
            commands_enabled: document.commands_enabled,
            local_bind_address: document.local_bind_address,
            peer_addresses: document.peer_addresses,
        }
    }
}

impl From<&ConnectionConfig> for ConnectionDocument {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            connection_number: config.connection_number,
            name: config.name.clone(),
            description: config.description.clone(),
            enabled: config.enabled,
            commands_enabled: config.commands_enabled,
            local_bind_address: config.local_bind_address.clone(),
            peer_addresses: config.peer_addresses.clone(),
        }
    }
}

/// 实时值文档（完整点位更新字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDocument {
    pub connection_number: u32,
    pub object_address: u32,
    pub asdu: u32,
    pub cause: u32,
    pub value: f64,
    pub value_string: String,
    pub invalid: bool,
    pub not_topical: bool,
    pub substituted: bool,
    pub blocked: bool,
    pub overflow: bool,
    pub transient: bool,
    pub carry: bool,
    pub source_time_ms: Option<i64>,
    pub source_time_ok: bool,
    pub received_at_ms: i64,
}

impl PointDocument {
    pub fn from_update(connection_number: u32, update: &PointUpdate) -> Self {
        Self {
            connection_number,
            object_address: update.object_address,
            asdu: update.asdu,
            cause: update.cause,
            value: update.value,
            value_string: update.value_string.clone(),
            invalid: update.quality.invalid,
            not_topical: update.quality.not_topical,
            substituted: update.quality.substituted,
            blocked: update.quality.blocked,
            overflow: update.quality.overflow,
            transient: update.quality.transient,
            carry: update.quality.carry,
            source_time_ms: update.source_time_ms,
            source_time_ok: update.source_time_ok,
            received_at_ms: update.received_at_ms,
        }
    }

    pub fn to_update(&self) -> PointUpdate {
        PointUpdate {
            object_address: self.object_address,
            asdu: self.asdu,
            cause: self.cause,
            value: self.value,
            value_string: self.value_string.clone(),
            quality: QualityFlags {
                invalid: self.invalid,
                not_topical: self.not_topical,
                substituted: self.substituted,
                blocked: self.blocked,
                overflow: self.overflow,
                transient: self.transient,
                carry: self.carry,
            },
            source_time_ms: self.source_time_ms,
            source_time_ok: self.source_time_ok,
            received_at_ms: self.received_at_ms,
        }
    }
}

/// 命令请求文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDocument {
    pub command_id: String,
    pub connection_number: u32,
    pub common_address: i64,
    pub object_address: i64,
    pub asdu: i64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub use_sbo: bool,
    pub value: f64,
    pub created_at_ms: i64,
    #[serde(default)]
    pub point_key: i64,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub value_string: String,
    #[serde(default)]
    pub originator_user_name: String,
    #[serde(default)]
    pub originator_ip_address: String,
}

impl From<&CommandRequest> for CommandDocument {
    fn from(request: &CommandRequest) -> Self {
        Self {
            command_id: request.command_id.clone(),
            connection_number: request.connection_number,
            common_address: request.common_address,
            object_address: request.object_address,
            asdu: request.asdu,
            duration: request.duration,
            use_sbo: request.use_sbo,
            value: request.value,
            created_at_ms: request.created_at_ms,
            point_key: request.point_key,
            tag: request.tag.clone(),
            value_string: request.value_string.clone(),
            originator_user_name: request.originator_user_name.clone(),
            originator_ip_address: request.originator_ip_address.clone(),
        }
    }
}

impl From<CommandDocument> for CommandRequest {
    fn from(document: CommandDocument) -> Self {
        Self {
            command_id: document.command_id,
            connection_number: document.connection_number,
            common_address: document.common_address,
            object_address: document.object_address,
            asdu: document.asdu,
            duration: document.duration,
            use_sbo: document.use_sbo,
            value: document.value,
            created_at_ms: document.created_at_ms,
            point_key: document.point_key,
            tag: document.tag,
            value_string: document.value_string,
            originator_user_name: document.originator_user_name,
            originator_ip_address: document.originator_ip_address,
        }
    }
}
