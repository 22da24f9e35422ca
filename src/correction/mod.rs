// Correction 模块 - 对话修正
//
// 每条对话的修正流程：跳过判定 → 名字修正 → 文本修正。
// 文本修正完整路径：
//   标点预整理 → 保护前替换 → 词库代码保护 → 保护后替换
//   → 数值保护 → 翻译 → 代码归一 → 译后替换 → 标点整理
//   → 数值还原 → 代码还原

pub mod fixes;

use anyhow::Result;
use std::sync::Arc;

use crate::config::TranslationSettings;
use crate::dictionary::{DictionaryStore, Snapshot};
use crate::protect;
use crate::translator::Translator;
use crate::types::{has_chinese, is_npc_channel, is_system_channel, DialogEvent};

/// 修正结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// 事件被静默丢弃，不产生任何输出
    Skipped,
    /// 修正完成，translated_name / translated_text 已写回
    Done,
}

pub struct CorrectionEngine {
    store: Arc<DictionaryStore>,
    translator: Arc<Translator>,
}

impl CorrectionEngine {
    pub fn new(store: Arc<DictionaryStore>, translator: Arc<Translator>) -> Self {
        Self { store, translator }
    }

    /// 修正一条对话事件
    ///
    /// 全程使用同一份词库快照；任何阶段出错由调用方统一兜底
    pub async fn correct(
        &self,
        event: &mut DialogEvent,
        settings: &TranslationSettings,
    ) -> Result<Correction> {
        let snapshot = self.store.snapshot();

        // 跳过判定：系统频道 + 忽略规则命中
        if settings.skip && is_system_channel(&event.code) {
            let combined = format!("{}{}", event.name, event.text);
            if fixes::can_ignore(&combined, &snapshot.ignore) {
                tracing::debug!("忽略规则命中，丢弃事件 {:?}", event.id);
                return Ok(Correction::Skipped);
            }
        }

        // 名字
        event.translated_name = if self.already_target(&event.name, settings) {
            fixes::replace_text(&event.name, &snapshot.combine)
        } else if is_npc_channel(&event.code) {
            self.name_correction(&event.name, settings, &snapshot).await?
        } else {
            event.name.clone()
        };

        // 文本
        event.translated_text = if self.already_target(&event.text, settings) {
            fixes::replace_text(&event.text, &snapshot.combine)
        } else {
            self.text_correction(&event.text, settings, &snapshot).await?
        };

        event.audio_text = event.text.clone();
        Ok(Correction::Done)
    }

    /// 文本已是目标文字时不翻译，只套词库
    fn already_target(&self, text: &str, settings: &TranslationSettings) -> bool {
        settings.skip_chinese && settings.to.is_chinese() && has_chinese(text)
    }

    /// 名字修正
    ///
    /// 先查词库（精确或 `#`/`##` 软匹配），查不到才翻译；
    /// 新解出的名字写入会话暂存层供本次会话复用。
    async fn name_correction(
        &self,
        name: &str,
        settings: &TranslationSettings,
        snapshot: &Snapshot,
    ) -> Result<String> {
        if name.is_empty() {
            return Ok(String::new());
        }

        // 精确与软匹配
        if let Some(entry) = fixes::same_as_entry(name, &snapshot.combine) {
            return Ok(entry.replacement.clone());
        }
        for suffix in ["#", "##"] {
            let soft = format!("{}{}", name, suffix);
            if let Some(entry) = fixes::same_as_entry(&soft, &snapshot.combine) {
                return Ok(entry.replacement.replace('#', ""));
            }
        }

        // 查不到：保护 → 翻译 → 还原
        let result = protect::protect(name, &snapshot.combine);
        let mut translated = result.text.clone();

        if !protect::can_skip_translation(&translated, &result.table) {
            translated = self
                .translator
                .translate(&translated, settings, &result.table)
                .await
                .text;
        }

        translated = protect::clear_code(&translated, &result.table);
        translated = fixes::mark_fix(&translated, true);
        translated = protect::restore(&translated, &result.table);

        // 学到的名字写入暂存层，之后的对话可直接命中
        if let Err(e) = self.store.save_temp_name(name, &translated) {
            tracing::warn!("保存暂存名字失败: {}", e);
        }

        Ok(translated)
    }

    /// 文本修正完整路径
    async fn text_correction(
        &self,
        text: &str,
        settings: &TranslationSettings,
        snapshot: &Snapshot,
    ) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        // 整句覆盖：直接使用固定译文，仍要套词库处理内嵌名字
        if let Some(entry) = fixes::same_as_entry(text, &snapshot.overwrite) {
            return Ok(fixes::replace_text(&entry.replacement, &snapshot.combine));
        }

        // 标点预整理
        let mut current = fixes::mark_fix(text, false);

        // 保护前字面替换
        current = fixes::replace_text(&current, &snapshot.before_protect);

        // 词库代码保护
        let result = protect::protect(&current, &snapshot.combine);
        current = result.text.clone();

        // 保护后、翻译前的字面替换
        current = fixes::replace_text(&current, &snapshot.after_protect);

        // 千分位数值保护
        let (value_fixed, value_table) = fixes::value_fix_before(&current);
        current = value_fixed;

        // 翻译
        if !protect::can_skip_translation(&current, &result.table) {
            current = self
                .translator
                .translate(&current, settings, &result.table)
                .await
                .text;
        }

        // 还原与收尾
        current = protect::clear_code(&current, &result.table);
        current = fixes::replace_text(&current, &snapshot.after_translation);
        current = fixes::mark_fix(&current, true);
        current = fixes::value_fix_after(&current, &value_table);
        current = protect::restore(&current, &result.table);

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslationSettings;
    use crate::dictionary::json;
    use crate::translator::{Engine, EngineRegistry, TranslationEngine};
    use crate::types::Language;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// 记录请求并按表回应的测试引擎
    struct ScriptedEngine {
        engine: Engine,
        reply: Box<dyn Fn(&str) -> String + Send + Sync>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        fn new(
            engine: Engine,
            reply: impl Fn(&str) -> String + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                engine,
                reply: Box::new(reply),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TranslationEngine for ScriptedEngine {
        fn engine(&self) -> Engine {
            self.engine
        }

        async fn translate(&self, _from: &str, _to: &str, text: &str) -> String {
            self.requests.lock().unwrap().push(text.to_string());
            (self.reply)(text)
        }
    }

    fn settings() -> TranslationSettings {
        TranslationSettings {
            engine: Engine::Youdao,
            from: Language::English,
            to: Language::TraditionalChinese,
            auto_change: false,
            ..Default::default()
        }
    }

    fn build(
        dir: &TempDir,
        engine: Arc<ScriptedEngine>,
    ) -> (Arc<DictionaryStore>, CorrectionEngine) {
        let store = Arc::new(DictionaryStore::new(
            dir.path().join("text"),
            dir.path().join("temp"),
        ));
        let mut registry = EngineRegistry::new();
        registry.register(engine);
        let translator = Arc::new(Translator::new(registry));
        let correction = CorrectionEngine::new(store.clone(), translator);
        (store, correction)
    }

    #[tokio::test]
    async fn test_end_to_end_protected_term() {
        // 规格示例：Rising Stones 被保护为单字母代码，
        // 还原后译文必须包含词库给定的「焰尾酒館」
        let dir = TempDir::new().unwrap();
        json::write_array(
            &dir.path().join("text/main/places.json"),
            &serde_json::json!([["石の家", "Rising Stones", "焰尾酒館", "石之家"]]),
        )
        .unwrap();

        // 模拟翻译器：改写句子但保留代码字母
        let engine = ScriptedEngine::new(Engine::Youdao, |text| {
            text.replace("The Scions will meet at the", "拂晓成员将在此集合：")
        });
        let (store, correction) = build(&dir, engine.clone());
        store
            .load(Language::English, Language::TraditionalChinese)
            .unwrap();

        let mut event =
            DialogEvent::new("003D", "", "The Scions will meet at the Rising Stones.");
        let outcome = correction.correct(&mut event, &settings()).await.unwrap();

        assert_eq!(outcome, Correction::Done);
        assert!(event.translated_text.contains("焰尾酒館"));
        // 发往引擎的文本不包含词条本体
        assert!(!engine.requests()[0].contains("Rising Stones"));
    }

    #[tokio::test]
    async fn test_numeric_value_roundtrip() {
        let dir = TempDir::new().unwrap();
        let engine =
            ScriptedEngine::new(Engine::Youdao, |_| "你获得了 1234 金币。".to_string());
        let (store, correction) = build(&dir, engine.clone());
        store
            .load(Language::English, Language::TraditionalChinese)
            .unwrap();

        let mut event = DialogEvent::new("0039", "", "You gained 1,234 gil.");
        correction.correct(&mut event, &settings()).await.unwrap();

        // 千分位精确还原
        assert!(event.translated_text.contains("1,234"));
        // 引擎看到的是去分隔符形式
        assert!(engine.requests()[0].contains("1234"));
        assert!(!engine.requests()[0].contains("1,234"));
    }

    #[tokio::test]
    async fn test_skip_rule_drops_event() {
        let dir = TempDir::new().unwrap();
        json::write_array(
            &dir.path().join("text/en/ignore.json"),
            &serde_json::json!(["^You sense"]),
        )
        .unwrap();

        let engine = ScriptedEngine::new(Engine::Youdao, |_| "不应到达".to_string());
        let (store, correction) = build(&dir, engine.clone());
        store
            .load(Language::English, Language::TraditionalChinese)
            .unwrap();

        let mut event = DialogEvent::new("0039", "", "You sense the aether.");
        let outcome = correction.correct(&mut event, &settings()).await.unwrap();

        assert_eq!(outcome, Correction::Skipped);
        assert!(engine.requests().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_bypasses_translation() {
        let dir = TempDir::new().unwrap();
        json::write_array(
            &dir.path().join("text/cht/overwrite-en/fixed.json"),
            &serde_json::json!([["Duty commenced.", "任务开始。"]]),
        )
        .unwrap();

        let engine = ScriptedEngine::new(Engine::Youdao, |_| "不应到达".to_string());
        let (store, correction) = build(&dir, engine.clone());
        store
            .load(Language::English, Language::TraditionalChinese)
            .unwrap();

        let mut event = DialogEvent::new("0039", "", "Duty commenced.");
        correction.correct(&mut event, &settings()).await.unwrap();

        assert_eq!(event.translated_text, "任务开始。");
        assert!(engine.requests().is_empty());
    }

    #[tokio::test]
    async fn test_name_lookup_and_learning() {
        let dir = TempDir::new().unwrap();
        let engine = ScriptedEngine::new(Engine::Youdao, |_| "阿爾菲諾".to_string());
        let (store, correction) = build(&dir, engine.clone());
        store
            .load(Language::English, Language::TraditionalChinese)
            .unwrap();

        let mut event = DialogEvent::new("003D", "Alphinaud", "Greetings.");
        correction.correct(&mut event, &settings()).await.unwrap();
        assert_eq!(event.translated_name, "阿爾菲諾");

        // 名字已写入暂存层：第二次不再调用引擎翻译名字
        let requests_before = engine.requests().len();
        let mut event2 = DialogEvent::new("003D", "Alphinaud", "");
        correction.correct(&mut event2, &settings()).await.unwrap();
        assert_eq!(event2.translated_name, "阿爾菲諾");
        assert_eq!(engine.requests().len(), requests_before);
    }

    #[tokio::test]
    async fn test_soft_suffix_name_lookup() {
        let dir = TempDir::new().unwrap();
        json::write_array(
            &dir.path().join("text/main/names.json"),
            &serde_json::json!([["ヤ", "Yda#", "雅妲#", "雅妲"]]),
        )
        .unwrap();

        let engine = ScriptedEngine::new(Engine::Youdao, |_| "不应到达".to_string());
        let (store, correction) = build(&dir, engine.clone());
        store
            .load(Language::English, Language::TraditionalChinese)
            .unwrap();

        let mut event = DialogEvent::new("003D", "Yda", "");
        correction.correct(&mut event, &settings()).await.unwrap();
        // `#` 软匹配命中，后缀从结果中去除
        assert_eq!(event.translated_name, "雅妲");
        assert!(engine.requests().is_empty());
    }

    #[tokio::test]
    async fn test_already_chinese_text_skips_translation() {
        let dir = TempDir::new().unwrap();
        json::write_array(
            &dir.path().join("text/main/names.json"),
            &serde_json::json!([["アルフィノ", "Alphinaud", "阿爾菲諾", "阿尔菲诺"]]),
        )
        .unwrap();

        let engine = ScriptedEngine::new(Engine::Youdao, |_| "不应到达".to_string());
        let (store, correction) = build(&dir, engine.clone());
        store
            .load(Language::English, Language::TraditionalChinese)
            .unwrap();

        let mut event = DialogEvent::new("0039", "", "Alphinaud 到达了石之家");
        correction.correct(&mut event, &settings()).await.unwrap();

        assert!(event.translated_text.contains("阿爾菲諾"));
        assert!(engine.requests().is_empty());
    }

    #[tokio::test]
    async fn test_audio_text_keeps_original() {
        let dir = TempDir::new().unwrap();
        let engine = ScriptedEngine::new(Engine::Youdao, |_| "译文".to_string());
        let (store, correction) = build(&dir, engine);
        store
            .load(Language::English, Language::TraditionalChinese)
            .unwrap();

        let mut event = DialogEvent::new("0039", "", "Original line.");
        correction.correct(&mut event, &settings()).await.unwrap();
        assert_eq!(event.audio_text, "Original line.");
    }
}
