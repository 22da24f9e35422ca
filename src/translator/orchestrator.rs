// 翻译编排
//
// 最多 3 次尝试：每次先按上一轮丢失的代码修补文本，再调用当前引擎；
// 回应为空且启用自动换引擎时按注册顺序轮询其他引擎；
// 代码全部保留或尝试用尽即结束，接受最后一次结果。
// 目标为繁体时对非空结果追加一次简繁转换，失败不致命。

use crate::config::TranslationSettings;
use crate::protect::{fix_code, missing_codes, CodeAssignment};
use crate::translator::{Engine, EngineRegistry, CONVERTER_ENGINE, ENGINE_LIST};
use crate::types::Language;

/// 重试上限：代码重要但不值得无限阻塞
pub const MAX_ATTEMPTS: u32 = 3;

/// 一次翻译调用的结果
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateOutcome {
    pub text: String,
    /// 本次调用结束时实际使用的引擎（可能因失败切换）
    pub engine: Engine,
}

pub struct Translator {
    registry: EngineRegistry,
}

impl Translator {
    pub fn new(registry: EngineRegistry) -> Self {
        Self { registry }
    }

    /// 翻译一段已保护的文本
    pub async fn translate(
        &self,
        text: &str,
        settings: &TranslationSettings,
        table: &[CodeAssignment],
    ) -> TranslateOutcome {
        let mut engine = settings.engine;
        let mut translated;
        let mut missing: Vec<char> = Vec::new();
        let mut current = text.to_string();
        let mut attempts = 0;

        loop {
            // 首轮没有丢失记录，fix_code 是无操作
            current = fix_code(&current, &missing);

            translated = self.call(engine, settings.from, settings.to, &current).await;
            attempts += 1;

            if translated.is_empty() {
                tracing::info!("{} 回应为空", engine.name());

                if settings.auto_change {
                    for next in ENGINE_LIST {
                        if next == engine {
                            continue;
                        }
                        tracing::info!("改用 {}", next.name());

                        translated = self.call(next, settings.from, settings.to, &current).await;
                        if !translated.is_empty() {
                            engine = next;
                            break;
                        }
                    }
                }
            }

            missing = missing_codes(&translated, table);
            if missing.is_empty() || attempts >= MAX_ATTEMPTS {
                break;
            }
            tracing::info!("代码丢失 {:?}，重试 ({}/{})", missing, attempts, MAX_ATTEMPTS);
        }

        let text = self.convert_traditional(translated, settings.to).await;
        TranslateOutcome { text, engine }
    }

    /// 调用单个引擎适配器
    async fn call(&self, engine: Engine, from: Language, to: Language, text: &str) -> String {
        let Some(adapter) = self.registry.get(engine) else {
            tracing::warn!("引擎 {} 未注册", engine.name());
            return String::new();
        };

        let result = adapter
            .translate(engine.language_code(from), engine.language_code(to), text)
            .await;
        tracing::debug!("{}: {}", engine.name(), result);
        result
    }

    /// 繁体目标的二次转换
    ///
    /// 主要引擎多数只输出简体；非空结果再经固定转换引擎走一次
    /// zh-CN -> zh-TW。转换失败时保留未转换结果。
    async fn convert_traditional(&self, text: String, to: Language) -> String {
        if to != Language::TraditionalChinese || text.is_empty() {
            return text;
        }

        let Some(converter) = self.registry.get(CONVERTER_ENGINE) else {
            return text;
        };

        let converted = converter.translate("zh-CN", "zh-TW", &text).await;
        if converted.is_empty() {
            text
        } else {
            converted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::TranslationEngine;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// 可编程的测试引擎
    struct FakeEngine {
        engine: Engine,
        responses: Vec<String>,
        calls: AtomicU32,
    }

    impl FakeEngine {
        fn new(engine: Engine, responses: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                engine,
                responses: responses.into_iter().map(|s| s.to_string()).collect(),
                calls: AtomicU32::new(0),
            })
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationEngine for FakeEngine {
        fn engine(&self) -> Engine {
            self.engine
        }

        async fn translate(&self, _from: &str, _to: &str, _text: &str) -> String {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.responses
                .get(index.min(self.responses.len().saturating_sub(1)))
                .cloned()
                .unwrap_or_default()
        }
    }

    fn settings(engine: Engine, auto_change: bool) -> TranslationSettings {
        TranslationSettings {
            engine,
            auto_change,
            to: Language::SimplifiedChinese,
            ..Default::default()
        }
    }

    fn assignment(code: char) -> CodeAssignment {
        CodeAssignment {
            code,
            original: "Rising Stones".into(),
            replacement: "焰尾酒館".into(),
        }
    }

    #[tokio::test]
    async fn test_simple_translate() {
        let youdao = FakeEngine::new(Engine::Youdao, vec!["你好"]);
        let mut registry = EngineRegistry::new();
        registry.register(youdao.clone());

        let translator = Translator::new(registry);
        let outcome = translator
            .translate("hello", &settings(Engine::Youdao, false), &[])
            .await;
        assert_eq!(outcome.text, "你好");
        assert_eq!(outcome.engine, Engine::Youdao);
        assert_eq!(youdao.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failover_switches_active_engine() {
        // Youdao 回应为空，Baidu 成功：结果来自 Baidu，当前引擎变为 Baidu
        let youdao = FakeEngine::new(Engine::Youdao, vec![""]);
        let baidu = FakeEngine::new(Engine::Baidu, vec!["百度译文"]);
        let mut registry = EngineRegistry::new();
        registry.register(youdao);
        registry.register(baidu);

        let translator = Translator::new(registry);
        let outcome = translator
            .translate("hello", &settings(Engine::Youdao, true), &[])
            .await;
        assert_eq!(outcome.text, "百度译文");
        assert_eq!(outcome.engine, Engine::Baidu);
    }

    #[tokio::test]
    async fn test_no_failover_when_disabled() {
        let youdao = FakeEngine::new(Engine::Youdao, vec![""]);
        let baidu = FakeEngine::new(Engine::Baidu, vec!["百度译文"]);
        let mut registry = EngineRegistry::new();
        registry.register(youdao);
        registry.register(baidu.clone());

        let translator = Translator::new(registry);
        let outcome = translator
            .translate("hello", &settings(Engine::Youdao, false), &[])
            .await;
        assert_eq!(outcome.text, "");
        assert_eq!(baidu.call_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_bound_is_three_attempts() {
        // 译文始终丢失代码 B：恰好 3 次尝试后接受现状
        let youdao = FakeEngine::new(Engine::Youdao, vec!["丢了代码"]);
        let mut registry = EngineRegistry::new();
        registry.register(youdao.clone());

        let translator = Translator::new(registry);
        let outcome = translator
            .translate("B text", &settings(Engine::Youdao, false), &[assignment('B')])
            .await;
        assert_eq!(youdao.call_count(), MAX_ATTEMPTS);
        assert_eq!(outcome.text, "丢了代码");
    }

    #[tokio::test]
    async fn test_retry_stops_when_codes_recovered() {
        // 第二次尝试保住了代码
        let youdao = FakeEngine::new(Engine::Youdao, vec!["丢了", "代码 B 回来了"]);
        let mut registry = EngineRegistry::new();
        registry.register(youdao.clone());

        let translator = Translator::new(registry);
        let outcome = translator
            .translate("B text", &settings(Engine::Youdao, false), &[assignment('B')])
            .await;
        assert_eq!(youdao.call_count(), 2);
        assert!(outcome.text.contains('B'));
    }

    #[tokio::test]
    async fn test_traditional_conversion_pass() {
        let youdao = FakeEngine::new(Engine::Youdao, vec!["简体译文"]);
        let google = FakeEngine::new(Engine::Google, vec!["繁體譯文"]);
        let mut registry = EngineRegistry::new();
        registry.register(youdao);
        registry.register(google.clone());

        let translator = Translator::new(registry);
        let mut s = settings(Engine::Youdao, false);
        s.to = Language::TraditionalChinese;

        let outcome = translator.translate("hello", &s, &[]).await;
        assert_eq!(outcome.text, "繁體譯文");
        assert_eq!(google.call_count(), 1);
    }

    #[tokio::test]
    async fn test_traditional_conversion_failure_not_fatal() {
        let youdao = FakeEngine::new(Engine::Youdao, vec!["简体译文"]);
        let google = FakeEngine::new(Engine::Google, vec![""]);
        let mut registry = EngineRegistry::new();
        registry.register(youdao);
        registry.register(google);

        let translator = Translator::new(registry);
        let mut s = settings(Engine::Youdao, false);
        s.to = Language::TraditionalChinese;

        let outcome = translator.translate("hello", &s, &[]).await;
        // 转换失败时保留未转换结果
        assert_eq!(outcome.text, "简体译文");
    }
}
