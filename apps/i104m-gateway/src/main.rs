//! I104M 网关进程：加载配置、连接实时库，然后运行接收/处理/命令/冗余各任务。

mod error;
mod runtime;

use error::GatewayError;
use i104m_config::GatewayConfig;
use i104m_storage::{RedisStore, StoreHealth};
use i104m_telemetry::init_tracing;
use runtime::{Gateway, Stores};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = GatewayConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    if let Err(err) = run(config).await {
        error!(target: "i104m.gateway", error = %err, "gateway_stopped");
        return Err(err.into());
    }
    Ok(())
}

async fn run(config: GatewayConfig) -> Result<(), GatewayError> {
    info!(
        target: "i104m.gateway",
        node_name = %config.node_name,
        instance_number = config.instance_number,
        redis_url = %config.redis_url,
        "gateway_starting"
    );

    // 实时库连接失败直接退出
    let store = Arc::new(RedisStore::connect(&config.redis_url, &config.key_prefix)?);
    store.ping().await?;

    let stores = Stores {
        points: store.clone(),
        commands: store.clone(),
        instances: store.clone(),
        health: store,
    };
    Gateway::start(&config, stores).await?.run().await
}
