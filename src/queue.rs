// 入口队列与管线调度
//
// 无界 FIFO + 1 秒节拍：running 打开时每拍最多取出一条事件，
// 完整等待其修正结束后才会处理下一拍的事件。
// 这同时把对外请求频率压在约每秒一次，起到事实上的限流作用。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

use crate::config::TranslationSettings;
use crate::correction::{Correction, CorrectionEngine};
use crate::sink::DialogSink;
use crate::translator::Translator;
use crate::types::{is_npc_channel, is_player_channel, supports_correction, DialogEvent};

/// 取件节拍
const TICK_INTERVAL: Duration = Duration::from_secs(1);

struct PipelineInner {
    queue: Mutex<VecDeque<DialogEvent>>,
    running: AtomicBool,
    /// 单调递增的时间戳分配器，重复毫秒强制 +1
    last_timestamp: Mutex<u64>,
    /// 未携带快照的事件使用的默认翻译设置
    default_settings: RwLock<TranslationSettings>,
    correction: Arc<CorrectionEngine>,
    translator: Arc<Translator>,
    sink: Arc<dyn DialogSink>,
}

/// 管线调度器
///
/// 队列与节拍状态由实例显式持有，start/stop/restart 控制生命周期
pub struct Pipeline {
    inner: Arc<PipelineInner>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    pub fn new(
        correction: Arc<CorrectionEngine>,
        translator: Arc<Translator>,
        sink: Arc<dyn DialogSink>,
        default_settings: TranslationSettings,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                queue: Mutex::new(VecDeque::new()),
                running: AtomicBool::new(false),
                last_timestamp: Mutex::new(0),
                default_settings: RwLock::new(default_settings),
                correction,
                translator,
                sink,
            }),
            ticker: Mutex::new(None),
        }
    }

    /// 暂停/恢复取件（队列继续接收提交）
    pub fn set_running(&self, value: bool) {
        self.inner.running.store(value, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// 更新默认翻译设置（语言/引擎切换后调用）
    pub fn set_default_settings(&self, settings: TranslationSettings) {
        *self
            .inner
            .default_settings
            .write()
            .expect("default_settings 锁中毒") = settings;
    }

    /// 提交一条事件，返回其 id
    ///
    /// id 与 timestamp 只在首次入队分配；已携带 id 的事件在
    /// replace 开启时原样保留（重译覆盖原条目），
    /// replace 关闭时强制分配新 id（重译产生新条目）。
    pub fn submit(&self, mut event: DialogEvent) -> String {
        if event.translation.is_none() {
            event.translation = Some(
                self.inner
                    .default_settings
                    .read()
                    .expect("default_settings 锁中毒")
                    .clone(),
            );
        }

        let keep_entry = event.translation.as_ref().map(|t| t.replace).unwrap_or(true);
        if event.id.is_none() || event.timestamp.is_none() || !keep_entry {
            let timestamp = self.inner.next_timestamp();
            event.id = Some(format!("id{}", timestamp));
            event.timestamp = Some(timestamp);
        }

        let id = event.id.clone().unwrap_or_default();
        self.inner.queue.lock().expect("queue 锁中毒").push_back(event);
        id
    }

    /// 待处理事件数
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().expect("queue 锁中毒").len()
    }

    /// 启动节拍任务
    pub fn start(&self) {
        let mut guard = self.ticker.lock().expect("ticker 锁中毒");
        if guard.is_some() {
            return;
        }

        let inner = self.inner.clone();
        *guard = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !inner.running.load(Ordering::SeqCst) {
                    continue;
                }

                let event = inner.queue.lock().expect("queue 锁中毒").pop_front();
                if let Some(event) = event {
                    // 单条事件完整处理结束前不取下一条
                    inner.process(event).await;
                }
            }
        }));
    }

    /// 停止节拍任务（队列内容保留）
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().expect("ticker 锁中毒").take() {
            handle.abort();
        }
    }

    /// 清空队列并重置节拍
    ///
    /// 未取出的事件直接丢弃，不做任何完成回调
    pub fn restart(&self) {
        self.stop();
        self.inner.queue.lock().expect("queue 锁中毒").clear();
        self.start();
        tracing::info!("入口队列已重置");
    }
}

impl PipelineInner {
    fn next_timestamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut last = self.last_timestamp.lock().expect("last_timestamp 锁中毒");
        let timestamp = if now <= *last { *last + 1 } else { now };
        *last = timestamp;
        timestamp
    }

    /// 处理一条事件（每事件错误边界）
    ///
    /// 占位在修正结束后才发出：被跳过的事件不允许产生任何输出
    async fn process(&self, mut event: DialogEvent) {
        let id = event.id.clone().unwrap_or_default();

        match self.correct_event(&mut event).await {
            Ok(Correction::Skipped) => {
                // 静默丢弃，连占位都不发
            }
            Ok(Correction::Done) => {
                self.sink.add(&id, &event.code);
                if event.translated_text.is_empty() {
                    self.sink.remove(&id);
                } else {
                    let name = event.translated_name.clone();
                    let text = event.translated_text.clone();
                    self.sink.update(&id, &name, &text, &event);
                }
            }
            Err(e) => {
                // 单条事件的异常不能中断队列：以可见的错误文本交付
                self.sink.add(&id, &event.code);
                tracing::error!("事件 {} 修正失败: {}", id, e);
                event.translated_text = format!("Error: {}", e);
                let name = event.translated_name.clone();
                let text = event.translated_text.clone();
                self.sink.update(&id, &name, &text, &event);
            }
        }
    }

    async fn correct_event(&self, event: &mut DialogEvent) -> anyhow::Result<Correction> {
        // 清除残留换行
        event.name = event.name.replace(['\r', '\n'], "");
        event.text = event.text.replace(['\r', '\n'], "");

        // 预设：未修正时原样交付
        event.translated_name = event.name.clone();
        event.translated_text = event.text.clone();
        event.audio_text = event.text.clone();

        let mut settings = event.translation.clone().unwrap_or_else(|| {
            self.default_settings
                .read()
                .expect("default_settings 锁中毒")
                .clone()
        });

        // 玩家频道使用独立的来源语言
        if is_player_channel(&event.code) {
            settings.from = settings.from_player;
        }

        if settings.fix && supports_correction(settings.from) {
            self.correction.correct(event, &settings).await
        } else {
            // 普通翻译路径：不做词库保护
            if is_npc_channel(&event.code) && !event.name.is_empty() {
                event.translated_name = self
                    .translator
                    .translate(&event.name, &settings, &[])
                    .await
                    .text;
            }
            event.translated_text = self
                .translator
                .translate(&event.text, &settings, &[])
                .await
                .text;
            Ok(Correction::Done)
        }
    }
}
