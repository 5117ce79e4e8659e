//! 文档变更流监听：记录批大小与每个文档的 id
//!
//! 本服务不订阅变更流；这是外部触发宿主（变更流触发器）按批调用的处理函数体。

use serde_json::Value;

/// 返回批内带 id 的文档 id（数字 id 转为字符串）
pub fn process_change_feed(documents: &[Value]) -> Vec<String> {
    if documents.is_empty() {
        return Vec::new();
    }
    tracing::info!(batch_size = documents.len(), "change feed batch");

    let mut ids = Vec::with_capacity(documents.len());
    for doc in documents {
        let id = match doc.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        match id {
            Some(id) => {
                tracing::info!(id = %id, "Doc");
                ids.push(id);
            }
            None => tracing::info!("Doc id=None"),
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_in_order() {
        let docs = vec![
            json!({"id": "a1", "status": "open"}),
            json!({"status": "orphan"}),
            json!({"id": 42}),
        ];
        assert_eq!(process_change_feed(&docs), vec!["a1", "42"]);
    }

    #[test]
    fn test_empty_batch() {
        assert!(process_change_feed(&[]).is_empty());
    }
}
