//! 本地持久化缓存（key-value）
//!
//! 对应移动端的 AsyncStorage：进程重启后仍然存在，按 key 存取字节

pub mod dao;
pub mod kv;
pub mod memory;

pub use dao::SqliteKvStore;
pub use kv::KvStore;
pub use memory::MemoryKvStore;
