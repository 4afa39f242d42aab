//! LLM 层：补全客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;

use crate::config::AppConfig;

/// 根据配置与环境变量选择补全后端；未启用或无 API Key 时返回 None（只走模板路径）
pub fn create_llm_from_config(cfg: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    if !cfg.llm.enabled {
        tracing::info!("LLM disabled by config, narrative will use templates");
        return None;
    }
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Some(Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                Some(&key),
            )))
        }
        _ => {
            tracing::warn!("No API key set, narrative will use templates");
            None
        }
    }
}
