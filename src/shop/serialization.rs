use serde::{Deserialize, Deserializer};

/// 服务端 ID 既可能是 JSON 数字（Long），也可能是字符串，统一转为 String
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Uint(u64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(v) => v.to_string(),
            RawId::Uint(v) => v.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// 反序列化 ID（数字或字符串）
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawId::deserialize(deserializer)?;
    Ok(raw.into())
}

/// 反序列化可选 ID（支持 null 与缺失）
pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<RawId> = Option::deserialize(deserializer)?;
    Ok(opt.map(String::from).filter(|s| !s.is_empty()))
}

/// 反序列化数组字段，null 视为空数组
pub fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 反序列化字符串字段，null 视为空字符串
pub fn deserialize_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 当前时间（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "deserialize_id")]
        id: String,
        #[serde(default, deserialize_with = "deserialize_opt_id")]
        line: Option<String>,
    }

    #[test]
    fn numeric_and_text_ids_are_both_accepted() {
        let h: Holder = serde_json::from_str(r#"{"id": 42, "line": "7"}"#).unwrap();
        assert_eq!(h.id, "42");
        assert_eq!(h.line.as_deref(), Some("7"));

        let h: Holder = serde_json::from_str(r#"{"id": "sku-1", "line": null}"#).unwrap();
        assert_eq!(h.id, "sku-1");
        assert!(h.line.is_none());

        let h: Holder = serde_json::from_str(r#"{"id": "sku-2"}"#).unwrap();
        assert!(h.line.is_none());
    }
}
