// 对话接收端
//
// 原始捕获数据在进入队列前的整备：
// 结构检查、频道开关、按频道的重复过滤、杂讯清理与换行修正。
// 通过全部检查的事件清除 id/timestamp 后提交管线。

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::queue::Pipeline;
use crate::types::{is_player_channel, is_system_channel, DialogEvent, Language};

lazy_static! {
    /// 重复比对前剔除的可变部分（括号内容随镜头变化）
    static ref FULLWIDTH_PAREN: Regex = Regex::new("（.*?）").expect("FULLWIDTH_PAREN");
    static ref HALFWIDTH_PAREN: Regex = Regex::new(r"\(.*?\)").expect("HALFWIDTH_PAREN");
    /// 连续开引号折叠为一个
    static ref REPEATED_QUOTE: Regex = Regex::new("「+").expect("REPEATED_QUOTE");
}

/// 捕获数据的接收与整备
pub struct Ingestor {
    config: AppConfig,
    pipeline: Arc<Pipeline>,
    /// 每个频道最近一条讯息的归一化形式
    last_by_channel: Mutex<HashMap<String, String>>,
}

impl Ingestor {
    pub fn new(config: AppConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            pipeline,
            last_by_channel: Mutex::new(HashMap::new()),
        }
    }

    /// 处理一条原始捕获数据
    ///
    /// 返回入队后的 id；任何检查不通过时返回 None 并静默丢弃
    pub fn process(&self, raw: &str) -> Option<String> {
        let event = self.prepare(raw)?;
        Some(self.pipeline.submit(event))
    }

    /// 整备一条事件，不提交
    fn prepare(&self, raw: &str) -> Option<DialogEvent> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("捕获数据解析失败: {}", e);
                return None;
            }
        };

        // 结构检查：code/name/text 三个字段缺一不可
        let code = value.get("code").and_then(|v| v.as_str()).unwrap_or("");
        let has_name = value.get("name").map(|v| v.is_string()).unwrap_or(false);
        let has_text = value.get("text").map(|v| v.is_string()).unwrap_or(false);
        if code.is_empty() || !has_name || !has_text {
            tracing::warn!("捕获数据缺少 code/name/text 字段");
            return None;
        }

        let mut event: DialogEvent = match serde_json::from_value(value) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("捕获数据字段类型错误: {}", e);
                return None;
            }
        };

        if !self.config.channel_enabled(&event.code) {
            tracing::debug!("频道 {} 未启用", event.code);
            return None;
        }

        // 同一频道的连续重复（镜头切换会重发对话）
        let fingerprint = normalize(&format!("{}:{}", event.name, event.text));
        {
            let mut last = self.last_by_channel.lock().expect("last_by_channel 锁中毒");
            if last.get(&event.code) == Some(&fingerprint) {
                tracing::debug!("频道 {} 重复讯息", event.code);
                return None;
            }
            last.insert(event.code.clone(), fingerprint);
        }

        // 省略号名字等同匿名
        if event.name.trim() == "..." {
            event.name.clear();
        }

        // 捕获层残留的控制符
        event.name = event.name.replace("%&", "");
        event.text = event.text.replace("%&", "");

        // 系统频道把名字并入正文，交给整句修正
        if is_system_channel(&event.code) && !event.name.is_empty() {
            event.text = format!("{}: {}", event.name, event.text);
            event.name.clear();
        }

        let from = if is_player_channel(&event.code) {
            self.config.translation.from_player
        } else {
            self.config.translation.from
        };
        fix_newlines(&mut event, from);

        // 强制重新分配条目标识
        event.id = None;
        event.timestamp = None;
        event.translation = Some(self.config.translation.clone());
        Some(event)
    }
}

/// 重复比对用的归一化
fn normalize(text: &str) -> String {
    let text = text.replace(['\r', '\n'], "").replace("%&", "");
    let text = FULLWIDTH_PAREN.replace_all(&text, "");
    let text = HALFWIDTH_PAREN.replace_all(&text, "");
    REPEATED_QUOTE.replace_all(&text, "「").into_owned()
}

/// 换行修正
///
/// 日文过场对话的换行是语气停顿，折为顿号；
/// 其余日文换行直接拼接，其他语言以空格衔接断词。
fn fix_newlines(event: &mut DialogEvent, from: Language) {
    if from == Language::Japanese {
        if event.kind.as_deref() == Some("CUTSCENE") {
            event.text = event.text.replace("\r\n", "、").replace(['\r', '\n'], "、");
        } else {
            event.text = event.text.replace(['\r', '\n'], "");
        }
    } else {
        event.text = event.text.replace("\r\n", " ").replace(['\r', '\n'], " ");
    }
}
