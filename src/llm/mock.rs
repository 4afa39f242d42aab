//! Mock 补全客户端（用于测试与离线运行，无需 API）
//!
//! 返回预设回复或预设错误，可选延迟；记录收到的最后一组消息便于断言 prompt 内容。

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};

/// Mock 客户端：按脚本回复
#[derive(Debug)]
pub struct MockLlmClient {
    reply: Result<String, String>,
    delay: Option<Duration>,
    last_messages: Mutex<Vec<Message>>,
}

impl MockLlmClient {
    /// 总是返回 reply
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            delay: None,
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// 总是返回传输错误
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            reply: Err(error.into()),
            delay: None,
            last_messages: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 最近一次 complete 收到的消息
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Default for MockLlmClient {
    /// 默认回复一段散文（非结构化），叙述生成器会回落到模板路径
    fn default() -> Self {
        Self::replying("The plant ran well overnight and there is not much to add.")
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}
