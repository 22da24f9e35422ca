// Translator 模块 - 翻译引擎与编排
//
// - mod: 引擎枚举、引擎专用语言代码表、TranslationEngine 能力与注册表
// - orchestrator: 有界重试 + 自动换引擎 + 繁体转换二次处理
// - http: 对外部翻译桥接服务的 reqwest 适配器

mod http;
mod orchestrator;

pub use http::HttpBridgeEngine;
pub use orchestrator::{TranslateOutcome, Translator, MAX_ATTEMPTS};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::Language;

// ============================================================================
// 引擎枚举
// ============================================================================

/// 可用的翻译引擎
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    Youdao,
    Baidu,
    Caiyun,
    Tencent,
    Papago,
    DeepL,
    Google,
}

/// 自动换引擎时的轮询顺序
pub const ENGINE_LIST: [Engine; 5] = [
    Engine::Youdao,
    Engine::Baidu,
    Engine::Caiyun,
    Engine::Papago,
    Engine::DeepL,
];

/// 繁体转换固定使用的引擎
pub const CONVERTER_ENGINE: Engine = Engine::Google;

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Youdao => "Youdao",
            Engine::Baidu => "Baidu",
            Engine::Caiyun => "Caiyun",
            Engine::Tencent => "Tencent",
            Engine::Papago => "Papago",
            Engine::DeepL => "DeepL",
            Engine::Google => "Google",
        }
    }

    /// 应用语言枚举到该引擎期望的语言代码
    ///
    /// 表内容不可变，随引擎描述一次性给定
    pub fn language_code(&self, language: Language) -> &'static str {
        use Language::*;
        match self {
            Engine::Baidu => match language {
                Auto => "auto",
                Japanese => "jp",
                English => "en",
                TraditionalChinese | SimplifiedChinese => "zh",
            },
            Engine::Caiyun => match language {
                Auto => "auto",
                Japanese => "ja",
                English => "en",
                TraditionalChinese | SimplifiedChinese => "zh",
            },
            Engine::Youdao => match language {
                Auto => "auto",
                Japanese => "ja",
                English => "en",
                TraditionalChinese | SimplifiedChinese => "zh-CHS",
            },
            Engine::Tencent => match language {
                Auto => "auto",
                Japanese => "jp",
                English => "en",
                TraditionalChinese | SimplifiedChinese => "zh",
            },
            Engine::Papago => match language {
                Auto => "detect",
                Japanese => "ja",
                English => "en",
                TraditionalChinese | SimplifiedChinese => "zh-CN",
            },
            Engine::DeepL => match language {
                Auto => "auto",
                Japanese => "JA",
                English => "EN",
                TraditionalChinese | SimplifiedChinese => "ZH",
            },
            Engine::Google => match language {
                Auto => "auto",
                Japanese => "ja",
                English => "en",
                TraditionalChinese | SimplifiedChinese => "zh-CN",
            },
        }
    }
}

// ============================================================================
// 引擎能力
// ============================================================================

/// 翻译引擎能力
///
/// 空字符串是唯一的失败信号；适配器必须捕获一切错误并归一化为空串，
/// 不允许异常越过这条边界。
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    /// 适配的引擎
    fn engine(&self) -> Engine;

    /// 翻译一段文本，失败时返回空串
    async fn translate(&self, from: &str, to: &str, text: &str) -> String;
}

// ============================================================================
// 注册表
// ============================================================================

/// 引擎注册表
///
/// 编排器只依赖能力接口，不认识具体引擎实现
#[derive(Default, Clone)]
pub struct EngineRegistry {
    engines: Vec<Arc<dyn TranslationEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, engine: Arc<dyn TranslationEngine>) {
        self.engines.push(engine);
    }

    pub fn get(&self, engine: Engine) -> Option<Arc<dyn TranslationEngine>> {
        self.engines.iter().find(|e| e.engine() == engine).cloned()
    }

    /// 按注册顺序列出全部引擎
    pub fn all(&self) -> &[Arc<dyn TranslationEngine>] {
        &self.engines
    }
}
