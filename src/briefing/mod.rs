//! 晨会简报生成
//!
//! 流水线：工具编排（并发 + 单工具超时）→ 叙述生成（模型 / 模板）→ 响应组装；
//! 外层由 service 的全局截止统一约束，超时则走兜底构建。

pub mod assembler;
pub mod audio;
pub mod fallback;
pub mod narrative;
pub mod options;
pub mod orchestrator;
pub mod service;
pub mod types;

pub use assembler::{assemble, error_result, expected_sections, AssemblyContext};
pub use audio::{narration_script, SpeechSynthesizer};
pub use fallback::build_fallback_sections;
pub use narrative::{NarrativeGenerator, WinsPolicy};
pub use options::BriefingOptions;
pub use orchestrator::ToolOrchestrator;
pub use service::{BriefingService, BriefingServiceBuilder};
pub use types::{
    AggregateSnapshot, BriefingResult, BriefingScope, Citation, Metric, ResultMetadata,
    ScopeArgs, Section, SectionStatus, SectionType, ToolOutcome, ToolSlot,
};
