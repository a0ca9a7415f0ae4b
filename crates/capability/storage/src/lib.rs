//! # I104M Storage 模块
//!
//! 网关与外部实时库之间的存储契约及其实现。
//!
//! ## 模块说明
//!
//! - [`traits`]：存储接口（实时值批量写入、命令队列、实例记录、存活探测）
//! - [`models`]：命令记录与持久化文档
//! - [`error`]：存储错误类型
//! - [`in_memory`]：内存实现，使用 `RwLock<HashMap>`，用于测试和本地演示
//! - [`redis`]：Redis 实现，多路复用连接 + JSON 文档
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use i104m_storage::{InstanceStore, RedisStore};
//!
//! let store = RedisStore::connect("redis://127.0.0.1:6379", "jsonscada")?;
//! let instance = store.find_instance("I104M", 1).await?;
//! ```

pub mod error;
pub mod in_memory;
pub mod models;
pub mod redis;
pub mod traits;

pub use error::*;
pub use models::*;
pub use redis::RedisStore;
pub use traits::*;

pub use in_memory::{InMemoryCommandQueue, InMemoryInstanceStore, InMemoryPointStore};
