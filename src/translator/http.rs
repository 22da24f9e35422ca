// 翻译桥接适配器
//
// 管线不直接实现各家翻译协议；实际请求由外部桥接服务完成。
// 这里只负责把 {engine, from, to, text} 递出去并取回译文，
// 任何传输错误都在此边界归一化为空串。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::translator::{Engine, TranslationEngine};

/// 创建标准配置的 HTTP 客户端（30s 超时，禁用代理）
pub fn create_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .no_proxy()
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    text: String,
}

/// 经由桥接服务调用某个引擎的适配器
#[derive(Clone)]
pub struct HttpBridgeEngine {
    engine: Engine,
    url: String,
    client: Client,
}

impl HttpBridgeEngine {
    pub fn new(engine: Engine, url: &str) -> Self {
        Self {
            engine,
            url: url.to_string(),
            client: create_http_client(),
        }
    }

    async fn request(&self, from: &str, to: &str, text: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "engine": self.engine.name(),
            "from": from,
            "to": to,
            "text": text,
        });

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("桥接服务返回 {}", status);
        }

        let parsed: BridgeResponse = response.json().await?;
        Ok(parsed.text)
    }
}

#[async_trait]
impl TranslationEngine for HttpBridgeEngine {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn translate(&self, from: &str, to: &str, text: &str) -> String {
        match self.request(from, to, text).await {
            Ok(translated) => translated,
            Err(e) => {
                // 空串是统一的失败信号，错误不越过适配器边界
                tracing::error!("{} 调用失败: {}", self.engine.name(), e);
                String::new()
            }
        }
    }
}
