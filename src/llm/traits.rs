//! 补全客户端抽象
//!
//! 叙述生成器只依赖 LlmClient::complete（非流式）；OpenAI 兼容后端与 Mock 均实现此 trait。

use async_trait::async_trait;

use crate::llm::Message;

/// LLM 客户端 trait：给定消息返回完整文本回复
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}
