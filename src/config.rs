// 应用配置
//
// 翻译设置 + 频道开关表的 JSON 持久化。
// 管线只读取 `translation` 与 `channel` 两部分。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::translator::Engine;
use crate::types::Language;

lazy_static::lazy_static! {
    /// 全局配置操作锁
    ///
    /// load 与 save 各自持锁，防止并发写导致的数据丢失；
    /// 需要原子的 load->modify->save 序列时由调用方整段持有
    pub static ref CONFIG_LOCK: Mutex<()> = Mutex::new(());
}

// ============================================================================
// 翻译设置
// ============================================================================

/// 翻译设置
///
/// 入队时整体快照到 `DialogEvent.translation`，
/// 同一事件的多次重试使用同一份快照。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationSettings {
    /// 当前引擎
    pub engine: Engine,
    /// 来源语言
    pub from: Language,
    /// 玩家频道的来源语言
    pub from_player: Language,
    /// 目标语言
    pub to: Language,
    /// 引擎回应为空时自动切换引擎
    pub auto_change: bool,
    /// 是否启用修正流程（词库保护等）
    pub fix: bool,
    /// 是否跳过系统频道中匹配忽略规则的讯息
    pub skip: bool,
    /// 文本已是目标文字时跳过翻译，仅套用词库
    pub skip_chinese: bool,
    /// 重新翻译时是否沿用既有条目（false 则产生新条目）
    pub replace: bool,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            engine: Engine::Youdao,
            from: Language::English,
            from_player: Language::English,
            to: Language::TraditionalChinese,
            auto_change: true,
            fix: true,
            skip: true,
            skip_chinese: true,
            replace: true,
        }
    }
}

// ============================================================================
// 应用配置
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub translation: TranslationSettings,
    /// 频道开关表，键为频道代码（如 "003D"）
    pub channel: HashMap<String, bool>,
    /// 外部翻译桥接服务地址
    pub bridge_url: String,
}

impl AppConfig {
    pub fn new() -> Self {
        let mut channel = HashMap::new();
        // 预设开启 NPC 对话与系统讯息频道
        for code in crate::types::NPC_CHANNELS {
            channel.insert(code.to_string(), true);
        }
        for code in crate::types::SYSTEM_CHANNELS {
            channel.insert(code.to_string(), true);
        }

        Self {
            translation: TranslationSettings::default(),
            channel,
            bridge_url: "http://127.0.0.1:8898/translate".to_string(),
        }
    }

    /// 频道是否启用
    pub fn channel_enabled(&self, code: &str) -> bool {
        self.channel.get(code).copied().unwrap_or(false)
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法获取配置目录"))?;
        let app_dir = config_dir.join("DialogFix");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// 词库根目录（text/）
    pub fn text_dir() -> Result<PathBuf> {
        let dir = Self::config_dir()?.join("text");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// 暂存词库目录（temp/）
    pub fn temp_dir() -> Result<PathBuf> {
        let dir = Self::config_dir()?.join("temp");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn load() -> Result<Self> {
        let _guard = CONFIG_LOCK.lock().expect("CONFIG_LOCK 锁中毒");
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::warn!("配置文件不存在，使用默认配置");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                // 解析失败不致命：记录并退回默认配置
                tracing::warn!("解析配置失败，使用默认配置: {}", e);
                Ok(Self::new())
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let _guard = CONFIG_LOCK.lock().expect("CONFIG_LOCK 锁中毒");
        let path = Self::config_path()?;
        let content = serde_json::to_string_pretty(self)?;

        // 原子写入：先写临时文件，再改名替换
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &path)?;

        tracing::info!("配置已保存: {:?}", path);
        Ok(())
    }
}
