// 对话修正与翻译管线
//
// 从捕获端接收游戏对话，按词库做保护与修正，
// 经外部引擎翻译后交付显示端。

pub mod config;
pub mod correction;
pub mod dictionary;
pub mod ingest;
pub mod protect;
pub mod queue;
pub mod sink;
pub mod translator;
pub mod types;

pub use config::{AppConfig, TranslationSettings, CONFIG_LOCK};
pub use correction::{Correction, CorrectionEngine};
pub use dictionary::DictionaryStore;
pub use ingest::Ingestor;
pub use queue::Pipeline;
pub use sink::{DialogSink, JsonLineSink};
pub use translator::{
    Engine, EngineRegistry, HttpBridgeEngine, TranslationEngine, Translator, ENGINE_LIST,
};
pub use types::{DialogEvent, Language};
