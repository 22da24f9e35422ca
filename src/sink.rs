// 显示端出口
//
// 管线不直接渲染，处理结果按 id 交给显示协作方。
// 最终译文为空表示该条目应被移除而非更新。

use crate::types::DialogEvent;

/// 显示协作方能力
pub trait DialogSink: Send + Sync {
    /// 事件开始处理，先占位
    fn add(&self, id: &str, code: &str);

    /// 写回修正结果
    fn update(&self, id: &str, translated_name: &str, translated_text: &str, event: &DialogEvent);

    /// 移除条目（最终译文为空）
    fn remove(&self, id: &str);
}

/// 按 JSON 行输出到标准输出的显示端
///
/// 下游进程逐行解析 `{"event": "...", ...}`
#[derive(Default)]
pub struct JsonLineSink;

impl DialogSink for JsonLineSink {
    fn add(&self, id: &str, code: &str) {
        println!(
            "{}",
            serde_json::json!({ "event": "add", "id": id, "code": code })
        );
    }

    fn update(&self, id: &str, translated_name: &str, translated_text: &str, event: &DialogEvent) {
        println!(
            "{}",
            serde_json::json!({
                "event": "update",
                "id": id,
                "translatedName": translated_name,
                "translatedText": translated_text,
                "dialog": event,
            })
        );
    }

    fn remove(&self, id: &str) {
        println!("{}", serde_json::json!({ "event": "remove", "id": id }));
    }
}
