//! 叙述生成器
//!
//! 两条路径：
//! - **模型路径**：快照摘要 + 固定结构化 prompt 交给补全后端，解析出四个块；
//! - **模板路径**：确定性模板，模型路径失败（传输错误、客户端 panic、解析失败、结构不符）时静默回落。
//!
//! 叙述质量下降优于请求失败：本模块从不向外返回错误。

pub mod digest;
pub mod parse;
pub mod template;
pub mod views;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::briefing::{AggregateSnapshot, Section, SectionStatus, SectionType, ToolSlot};
use crate::core::BriefingError;
use crate::llm::{LlmClient, Message};

pub use digest::render_digest;
pub use parse::{parse_model_reply, ModelBlock, ModelSections};
pub use template::{template_sections, WinsPolicy};

use template::{
    actions_metrics, citations_of, concerns_metrics, headline_metrics, wins_metrics,
};

/// 模型路径的固定结构化 prompt
pub const NARRATIVE_PROMPT: &str = "You write the spoken shift briefing for a manufacturing plant. \
Use only the facts in the data digest you are given. \
Reply with a single JSON object with exactly four keys: \"headline\", \"wins\", \"concerns\", \"actions\". \
Each value must be an object with non-empty string fields \"title\" and \"content\". \
Keep every [Source: ...] marker from the digest next to the fact it supports. \
Do not write anything outside the JSON object.";

/// 叙述生成器：可选补全后端 + wins 策略
#[derive(Clone)]
pub struct NarrativeGenerator {
    llm: Option<Arc<dyn LlmClient>>,
    wins_policy: WinsPolicy,
}

impl NarrativeGenerator {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, wins_policy: WinsPolicy) -> Self {
        Self { llm, wins_policy }
    }

    /// 生成段落：先试模型路径，失败则走模板路径；区域简报额外附加 area 段
    pub async fn generate_sections(
        &self,
        snapshot: &AggregateSnapshot,
        area_id: Option<&str>,
    ) -> Vec<Section> {
        if let Some(llm) = &self.llm {
            match self.model_sections(llm.as_ref(), snapshot).await {
                Ok(mut sections) => {
                    tracing::info!("Narrative generated by model");
                    if let Some(area_id) = area_id {
                        sections.extend(template::area(snapshot, area_id));
                    }
                    return sections;
                }
                Err(e @ BriefingError::NarrativeParse(_)) => {
                    tracing::warn!(error = %e, "Model reply did not parse, using templates");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Model narrative unavailable, using templates");
                }
            }
        }

        tracing::info!("Narrative generated from templates");
        template_sections(snapshot, self.wins_policy, area_id)
    }

    async fn model_sections(
        &self,
        llm: &dyn LlmClient,
        snapshot: &AggregateSnapshot,
    ) -> Result<Vec<Section>, BriefingError> {
        let messages = vec![
            Message::system(NARRATIVE_PROMPT),
            Message::user(format!("Data digest:\n\n{}", render_digest(snapshot))),
        ];
        // 补全客户端 panic 与传输错误同样回落到模板路径
        let reply = AssertUnwindSafe(llm.complete(&messages))
            .catch_unwind()
            .await
            .map_err(|_| BriefingError::LlmError("completion client panicked".to_string()))?
            .map_err(BriefingError::LlmError)?;
        let parsed = parse_model_reply(&reply)?;
        Ok(model_to_sections(parsed, snapshot))
    }
}

/// 四个模型块包装为 complete 段落；指标与引用仍取自对应槽位
fn model_to_sections(parsed: ModelSections, snapshot: &AggregateSnapshot) -> Vec<Section> {
    let build = |section_type: SectionType, block: ModelBlock, slots: &[ToolSlot]| {
        Section::new(section_type, block.title, block.content, SectionStatus::Complete)
            .with_citations(citations_of(snapshot, slots))
    };

    vec![
        build(SectionType::Headline, parsed.headline, &[ToolSlot::SafetyEvents])
            .with_metrics(headline_metrics(snapshot)),
        build(SectionType::Wins, parsed.wins, &[ToolSlot::ProductionStatus])
            .with_metrics(wins_metrics(snapshot)),
        build(
            SectionType::Concerns,
            parsed.concerns,
            &[ToolSlot::ProductionStatus, ToolSlot::SafetyEvents],
        )
        .with_metrics(concerns_metrics(snapshot)),
        build(SectionType::Actions, parsed.actions, &[ToolSlot::ActionList])
            .with_metrics(actions_metrics(snapshot)),
    ]
}
