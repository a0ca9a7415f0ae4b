/// 驱动名称（实例与连接按该名称检索）。
pub const DRIVER_NAME: &str = "I104M";

/// 未配置本地绑定地址时使用。
pub const DEFAULT_LOCAL_BIND_ADDRESS: &str = "0.0.0.0:8099";

/// 未配置对端地址时使用。
pub const DEFAULT_PEER_ADDRESS: &str = "127.0.0.1";

/// 单条逻辑链路配置（每个实例只允许一个连接）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub connection_number: u32,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub commands_enabled: bool,
    pub local_bind_address: String,
    /// 对端地址：既是命令发送目的地，也是接收来源白名单。
    pub peer_addresses: Vec<String>,
}

impl ConnectionConfig {
    /// 补齐缺省的绑定地址与对端地址。
    pub fn with_defaults(mut self) -> Self {
        if self.local_bind_address.trim().is_empty() {
            self.local_bind_address = DEFAULT_LOCAL_BIND_ADDRESS.to_string();
        }
        if self.peer_addresses.is_empty() {
            self.peer_addresses.push(DEFAULT_PEER_ADDRESS.to_string());
        }
        self
    }
}

/// 冗余仲裁记录（存放在外部存储，不归任何进程所有）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceState {
    pub driver: String,
    pub instance_number: u32,
    pub enabled: bool,
    pub log_level: i64,
    pub node_names: Vec<String>,
    pub active_node_name: String,
    pub active_node_keep_alive_ms: i64,
}

impl InstanceState {
    /// 节点名是否在可运行节点列表中（忽略首尾空白）。
    pub fn is_eligible(&self, node_name: &str) -> bool {
        let node_name = node_name.trim();
        self.node_names.iter().any(|name| name.trim() == node_name)
    }

    /// 记录中的活动节点是否为指定节点。
    pub fn is_held_by(&self, node_name: &str) -> bool {
        self.active_node_name.trim() == node_name.trim()
    }
}
