// dialog-fix 可执行入口
//
// 标准输入逐行接收捕获端的 JSON 事件，
// 处理结果以 JSON 行写到标准输出。

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use dialog_fix_lib::translator::CONVERTER_ENGINE;
use dialog_fix_lib::{
    AppConfig, CorrectionEngine, DictionaryStore, EngineRegistry, HttpBridgeEngine, Ingestor,
    JsonLineSink, Pipeline, Translator, ENGINE_LIST,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::load()?;
    tracing::info!(
        "翻译设置: {} {:?} -> {:?}",
        config.translation.engine.name(),
        config.translation.from,
        config.translation.to
    );

    // 全部引擎经由同一个桥接服务
    let mut registry = EngineRegistry::new();
    for engine in ENGINE_LIST {
        registry.register(Arc::new(HttpBridgeEngine::new(engine, &config.bridge_url)));
    }
    registry.register(Arc::new(HttpBridgeEngine::new(
        CONVERTER_ENGINE,
        &config.bridge_url,
    )));

    let store = Arc::new(DictionaryStore::new(
        AppConfig::text_dir()?,
        AppConfig::temp_dir()?,
    ));
    store.load(config.translation.from, config.translation.to)?;

    let translator = Arc::new(Translator::new(registry));
    let correction = Arc::new(CorrectionEngine::new(store, translator.clone()));
    let pipeline = Arc::new(Pipeline::new(
        correction,
        translator,
        Arc::new(JsonLineSink),
        config.translation.clone(),
    ));
    pipeline.start();
    pipeline.set_running(true);

    let ingestor = Ingestor::new(config, pipeline.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        ingestor.process(line);
    }

    // 输入端关闭：清空剩余队列后退出
    while pipeline.pending() > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
    pipeline.stop();
    Ok(())
}
