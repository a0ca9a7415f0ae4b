//! 网关运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 网关运行配置。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub node_name: String,
    pub redis_url: String,
    pub key_prefix: String,
    pub instance_number: u32,
    pub queue_capacity: usize,
    pub housekeeping_interval: Duration,
    pub command_max_age: Duration,
    pub redundancy_missed_limit: u32,
    pub source_utc_offset_minutes: i32,
}

impl GatewayConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_name = read_optional(&lookup, "I104M_NODE_NAME")
            .ok_or_else(|| ConfigError::Missing("I104M_NODE_NAME".to_string()))?;
        let redis_url = read_optional(&lookup, "I104M_REDIS_URL")
            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());
        let key_prefix =
            read_optional(&lookup, "I104M_KEY_PREFIX").unwrap_or_else(|| "jsonscada".to_string());
        let instance_number = read_with_default(&lookup, "I104M_INSTANCE_NUMBER", 1u32)?;
        let queue_capacity = read_with_default(&lookup, "I104M_QUEUE_CAPACITY", 1000usize)?;
        if queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "I104M_QUEUE_CAPACITY".to_string(),
                "0".to_string(),
            ));
        }
        let housekeeping_interval_seconds =
            read_with_default(&lookup, "I104M_HOUSEKEEPING_INTERVAL_SECONDS", 5u64)?.max(1);
        let command_max_age_seconds =
            read_with_default(&lookup, "I104M_COMMAND_MAX_AGE_SECONDS", 10u64)?;
        let redundancy_missed_limit =
            read_with_default(&lookup, "I104M_REDUNDANCY_MISSED_LIMIT", 4u32)?;
        let source_utc_offset_minutes =
            read_with_default(&lookup, "I104M_SOURCE_UTC_OFFSET_MINUTES", 0i32)?;
        if source_utc_offset_minutes.unsigned_abs() >= 24 * 60 {
            return Err(ConfigError::Invalid(
                "I104M_SOURCE_UTC_OFFSET_MINUTES".to_string(),
                source_utc_offset_minutes.to_string(),
            ));
        }

        Ok(Self {
            node_name,
            redis_url,
            key_prefix,
            instance_number,
            queue_capacity,
            housekeeping_interval: Duration::from_secs(housekeeping_interval_seconds),
            command_max_age: Duration::from_secs(command_max_age_seconds),
            redundancy_missed_limit,
            source_utc_offset_minutes,
        })
    }
}

/// 读取可选字符串（空白视为未设置）。
fn read_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_with_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let value = match read_optional(lookup, key) {
        Some(value) => value,
        None => return Ok(default),
    };
    value
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}
