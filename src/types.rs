// 核心类型定义
//
// 定义了管线所需的基础类型，包括：
// - 对话事件 (DialogEvent)
// - 语言枚举 (Language)
// - 频道分类（NPC / 系统 / 玩家）

use serde::{Deserialize, Serialize};

// ============================================================================
// 语言
// ============================================================================

/// 应用层语言枚举
///
/// 序列化形式与词库文件中使用的字符串一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    Auto,
    Japanese,
    English,
    #[serde(rename = "Traditional-Chinese")]
    TraditionalChinese,
    #[serde(rename = "Simplified-Chinese")]
    SimplifiedChinese,
}

impl Language {
    /// main 词库每行为 `[ja, en, zht, zhs]`，返回该语言所在列
    pub fn main_index(&self) -> Option<usize> {
        match self {
            Language::Japanese => Some(0),
            Language::English => Some(1),
            Language::TraditionalChinese => Some(2),
            Language::SimplifiedChinese => Some(3),
            Language::Auto => None,
        }
    }

    /// 是否为中文目标语言
    pub fn is_chinese(&self) -> bool {
        matches!(
            self,
            Language::TraditionalChinese | Language::SimplifiedChinese
        )
    }

    /// 该语言对应的词库子目录
    pub fn text_dir(&self) -> &'static str {
        match self {
            Language::Japanese => "jp",
            Language::English => "en",
            Language::TraditionalChinese => "cht",
            Language::SimplifiedChinese => "chs",
            Language::Auto => "en",
        }
    }
}

/// 支持完整修正流程的来源语言
///
/// 原则上每个来源语言需要自己的词形规则。目前只有英文实现了
/// 复数/形容词变化，其余语言走普通翻译路径。
pub fn supports_correction(language: Language) -> bool {
    matches!(language, Language::English)
}

// ============================================================================
// 频道分类
// ============================================================================

/// NPC 对话频道（说话者名字需要翻译）
pub const NPC_CHANNELS: [&str; 3] = ["003D", "0044", "2AB9"];

/// 系统讯息频道
pub const SYSTEM_CHANNELS: [&str; 8] = [
    "0039", "0839", "0003", "0038", "003C", "0048", "001D", "001C",
];

/// 玩家发言频道（Say/Shout/Party/Tell/FC/Yell/Alliance/LS/CWLS/Novice）
pub const PLAYER_CHANNELS: [&str; 24] = [
    "000A", "000B", "000E", "000D", "0018", "001E", "000F",
    // LinkShell 1-8
    "0010", "0011", "0012", "0013", "0014", "0015", "0016", "0017",
    // CWLS 1-8
    "0025", "0065", "0066", "0067", "0068", "0069", "006A", "006B",
    // Novice Network
    "001B",
];

pub fn is_npc_channel(code: &str) -> bool {
    NPC_CHANNELS.contains(&code)
}

pub fn is_system_channel(code: &str) -> bool {
    SYSTEM_CHANNELS.contains(&code)
}

pub fn is_player_channel(code: &str) -> bool {
    PLAYER_CHANNELS.contains(&code)
}

// ============================================================================
// 对话事件
// ============================================================================

/// 一条捕获到的对话
///
/// `id` 与 `timestamp` 在首次进入队列时分配，之后不再改变；
/// 除非调用方显式清除以请求重新翻译。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialogEvent {
    pub id: Option<String>,
    pub code: String,
    pub name: String,
    pub text: String,
    /// 事件类型（如 CUTSCENE），影响换行处理
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub translated_name: String,
    pub translated_text: String,
    pub audio_text: String,
    pub timestamp: Option<u64>,
    /// 入队时的翻译设置快照
    pub translation: Option<crate::config::TranslationSettings>,
}

impl DialogEvent {
    pub fn new(code: &str, name: &str, text: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }
}

// ============================================================================
// 文字判定
// ============================================================================

/// 文本是否含有汉字（CJK 区段）
pub fn has_chinese(text: &str) -> bool {
    text.chars()
        .any(|c| ('\u{3400}'..='\u{9FFF}').contains(&c))
}
