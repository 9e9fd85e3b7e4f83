use anyhow::Result;
use async_trait::async_trait;

/// 本地持久化缓存接口
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 读取 key，不存在时返回 None
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入（覆盖）key
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// 删除 key，不存在时不报错
    async fn remove(&self, key: &str) -> Result<()>;
}
