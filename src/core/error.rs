//! 简报引擎错误类型
//!
//! 工具失败 / 超时在守卫层即被吸收为 ToolOutcome，不会向上传播；
//! BriefingError 只用于内部阶段之间传递，最终由 BriefingService 转为错误形态的 BriefingResult。

use thiserror::Error;

/// 简报生成过程中可能出现的错误（工具、叙述、配置、作用域等）
#[derive(Error, Debug)]
pub enum BriefingError {
    #[error("{0} timed out")]
    ToolTimeout(String),

    #[error("Narrative parse error: {0}")]
    NarrativeParse(#[from] NarrativeParseError),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    Config(String),

    /// 同一个槽位注册了两个工具
    #[error("Duplicate tool slot: {0}")]
    DuplicateSlot(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// 内部阶段 panic 或不可恢复错误（TotalFailure）
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 模型回复解析失败的原因（模型路径的 tagged result，调用方据此回落到模板路径）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrativeParseError {
    #[error("no JSON document in reply")]
    NoJson,

    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("missing block: {0}")]
    MissingBlock(&'static str),

    #[error("empty title or content in block: {0}")]
    EmptyBlock(&'static str),

    #[error("unexpected block: {0}")]
    UnexpectedBlock(String),
}

impl From<config::ConfigError> for BriefingError {
    fn from(e: config::ConfigError) -> Self {
        BriefingError::Config(e.to_string())
    }
}
