//! 语音合成协作者边界
//!
//! 核心不做 TTS，只在配置请求音频且注入了合成器时，把朗读稿交给外部并记录返回的流地址。

use async_trait::async_trait;

use crate::briefing::Section;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// 合成朗读稿，返回音频流 URL
    async fn synthesize(&self, briefing_id: &str, script: &str) -> Result<String, String>;
}

/// 朗读稿：每段「标题。内容」，段与段之间空行
pub fn narration_script(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| format!("{}.\n{}", s.title.trim_end_matches('.'), s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
