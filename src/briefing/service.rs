//! 简报服务（全局截止管理）
//!
//! generate_briefing 是唯一对外入口：一个外层 timeout(total_budget) 同时包住工具编排与叙述生成。
//! - 预算内完成：正常组装，timed_out=false；
//! - 预算耗尽：丢弃在途阶段，对截止时刻的快照运行兜底构建，timed_out=true；
//! - 内部阶段 panic / 作用域非法：返回单个 failed 段落、scope=error 的结果。
//!
//! 服务对象在启动时构建一次，通过 Arc 共享给各请求处理方，不持有跨请求的可变状态。

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tracing::Instrument;

use crate::briefing::assembler::{assemble, error_result, expected_sections, AssemblyContext};
use crate::briefing::audio::{narration_script, SpeechSynthesizer};
use crate::briefing::fallback::build_fallback_sections;
use crate::briefing::narrative::{NarrativeGenerator, WinsPolicy};
use crate::briefing::orchestrator::ToolOrchestrator;
use crate::briefing::{AggregateSnapshot, BriefingOptions, BriefingResult, BriefingScope, ScopeArgs, Section};
use crate::config::AppConfig;
use crate::core::BriefingError;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::tools::{ToolExecutor, ToolRegistry};

/// 外层截止内各阶段的产出
struct StageOutput {
    sections: Vec<Section>,
    audio_url: Option<String>,
}

/// 外层截止的三种结局
enum Deadline<T> {
    Finished(T),
    Panicked,
    Expired,
}

/// 在 budget 内驱动 stage；到期时 stage 被 drop，其借用随之结束
async fn within_deadline<F: Future>(budget: Duration, stage: F) -> Deadline<F::Output> {
    match tokio::time::timeout(budget, AssertUnwindSafe(stage).catch_unwind()).await {
        Ok(Ok(output)) => Deadline::Finished(output),
        Ok(Err(_)) => Deadline::Panicked,
        Err(_) => Deadline::Expired,
    }
}

pub struct BriefingService {
    orchestrator: ToolOrchestrator,
    narrative: NarrativeGenerator,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    options: BriefingOptions,
}

impl BriefingService {
    pub fn builder(registry: ToolRegistry) -> BriefingServiceBuilder {
        BriefingServiceBuilder::new(registry)
    }

    /// 从应用配置构建：两层超时、槽位列表、wins 策略与补全后端均来自配置
    pub fn from_config(cfg: &AppConfig, registry: ToolRegistry) -> Result<Self, BriefingError> {
        let options = BriefingOptions::from_config(&cfg.briefing)?;
        let mut builder = Self::builder(registry).options(options);
        if let Some(llm) = create_llm_from_config(cfg) {
            builder = builder.llm(llm);
        }
        Ok(builder.build())
    }

    /// 生成简报；从不返回错误，降级只体现在 metadata 与段落 status 中
    pub async fn generate_briefing(
        &self,
        user_id: &str,
        scope: BriefingScope,
        area_id: Option<&str>,
    ) -> BriefingResult {
        let started_at = Instant::now();
        let span = tracing::info_span!("briefing", user_id = %user_id, scope = ?scope);

        async move {
            let args = match scope_args(user_id, scope, area_id) {
                Ok(args) => args,
                Err(e) => {
                    tracing::error!(error = %e, "Rejected briefing request");
                    return error_result(&e.to_string(), started_at);
                }
            };
            let briefing_id = uuid::Uuid::new_v4().to_string();

            let mut snapshot = self.orchestrator.empty_snapshot();
            let outcome = within_deadline(
                self.options.total_budget,
                self.run_stages(&briefing_id, &args, &mut snapshot),
            )
            .await;

            let (output, timed_out) = match outcome {
                Deadline::Finished(output) => (output, false),
                Deadline::Panicked => {
                    let e = BriefingError::Internal("briefing stage panicked".to_string());
                    tracing::error!(error = %e, "Briefing generation failed");
                    return error_result(&e.to_string(), started_at);
                }
                Deadline::Expired => {
                    tracing::warn!(
                        budget_ms = self.options.total_budget.as_millis() as u64,
                        absent = ?snapshot.absent(),
                        "Briefing deadline exceeded, building fallback sections"
                    );
                    let output = StageOutput {
                        sections: build_fallback_sections(&snapshot),
                        audio_url: None,
                    };
                    (output, true)
                }
            };

            let result = assemble(
                output.sections,
                &snapshot,
                AssemblyContext {
                    id: briefing_id,
                    scope: args.scope,
                    area_id: args.area_id.clone(),
                    started_at,
                    timed_out,
                    audio_url: output.audio_url,
                    expected_sections: expected_sections(self.options.wins_policy, args.scope),
                },
            );
            tracing::info!(
                sections = result.sections.len(),
                completion = result.metadata.completion_percentage,
                timed_out = result.metadata.timed_out,
                failures = ?result.metadata.tool_failures,
                duration_ms = result.metadata.generation_duration_ms,
                "Briefing generated"
            );
            result
        }
        .instrument(span)
        .await
    }

    /// 编排 → 叙述 →（可选）音频；整体受外层截止约束
    async fn run_stages(
        &self,
        briefing_id: &str,
        args: &ScopeArgs,
        snapshot: &mut AggregateSnapshot,
    ) -> StageOutput {
        self.orchestrator.orchestrate_into(args, snapshot).await;

        let sections = self
            .narrative
            .generate_sections(snapshot, args.area_id.as_deref())
            .await;

        let audio_url = match (&self.synthesizer, self.options.audio_requested) {
            (Some(synthesizer), true) => {
                let script = narration_script(&sections);
                match AssertUnwindSafe(synthesizer.synthesize(briefing_id, &script))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(url)) => Some(url),
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Audio synthesis failed, returning text only");
                        None
                    }
                    Err(_) => {
                        tracing::warn!("Audio synthesizer panicked, returning text only");
                        None
                    }
                }
            }
            _ => None,
        };

        StageOutput {
            sections,
            audio_url,
        }
    }
}

fn scope_args(
    user_id: &str,
    scope: BriefingScope,
    area_id: Option<&str>,
) -> Result<ScopeArgs, BriefingError> {
    let area_id = area_id.map(str::trim).filter(|a| !a.is_empty());
    match (scope, area_id) {
        (BriefingScope::Error, _) => Err(BriefingError::InvalidScope(
            "error is not a requestable scope".to_string(),
        )),
        (BriefingScope::Area, None) => Err(BriefingError::InvalidScope(
            "area briefing requires an area_id".to_string(),
        )),
        (BriefingScope::Area, Some(area_id)) => Ok(ScopeArgs {
            user_id: user_id.to_string(),
            scope,
            area_id: Some(area_id.to_string()),
        }),
        (BriefingScope::Plant, area_id) => {
            if area_id.is_some() {
                tracing::warn!("Ignoring area_id for plant-wide briefing");
            }
            Ok(ScopeArgs {
                user_id: user_id.to_string(),
                scope,
                area_id: None,
            })
        }
    }
}

/// BriefingService 构建器
pub struct BriefingServiceBuilder {
    registry: ToolRegistry,
    llm: Option<Arc<dyn LlmClient>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    options: BriefingOptions,
}

impl BriefingServiceBuilder {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            llm: None,
            synthesizer: None,
            options: BriefingOptions::default(),
        }
    }

    pub fn options(mut self, options: BriefingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn per_tool_budget(mut self, budget: Duration) -> Self {
        self.options.per_tool_budget = budget;
        self
    }

    pub fn total_budget(mut self, budget: Duration) -> Self {
        self.options.total_budget = budget;
        self
    }

    pub fn wins_policy(mut self, policy: WinsPolicy) -> Self {
        self.options.wins_policy = policy;
        self
    }

    pub fn audio_requested(mut self, requested: bool) -> Self {
        self.options.audio_requested = requested;
        self
    }

    pub fn build(self) -> BriefingService {
        let mut registry = self.registry;
        registry.retain_slots(&self.options.slots);

        BriefingService {
            orchestrator: ToolOrchestrator::new(
                registry,
                ToolExecutor::new(self.options.per_tool_budget),
            ),
            narrative: NarrativeGenerator::new(self.llm, self.options.wins_policy),
            synthesizer: self.synthesizer,
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_args_validation() {
        assert!(scope_args("u", BriefingScope::Area, None).is_err());
        assert!(scope_args("u", BriefingScope::Area, Some("  ")).is_err());
        assert!(scope_args("u", BriefingScope::Error, None).is_err());

        let args = scope_args("u", BriefingScope::Area, Some("packaging")).unwrap();
        assert_eq!(args.area_id.as_deref(), Some("packaging"));

        let args = scope_args("u", BriefingScope::Plant, Some("packaging")).unwrap();
        assert!(args.area_id.is_none());
    }

    #[tokio::test]
    async fn test_within_deadline_outcomes() {
        let finished = within_deadline(Duration::from_millis(200), async { 7 }).await;
        assert!(matches!(finished, Deadline::Finished(7)));

        let expired = within_deadline(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        assert!(matches!(expired, Deadline::Expired));
    }

    #[tokio::test]
    async fn test_core_stage_panic_is_caught() {
        let outcome: Deadline<()> =
            within_deadline(Duration::from_secs(1), async { panic!("assembly bug") }).await;
        assert!(matches!(outcome, Deadline::Panicked));
    }

    #[tokio::test]
    async fn test_invalid_scope_returns_error_result() {
        let service = BriefingService::builder(ToolRegistry::new()).build();
        let result = service
            .generate_briefing("u", BriefingScope::Area, None)
            .await;
        assert_eq!(result.scope, BriefingScope::Error);
        assert_eq!(result.sections.len(), 1);
    }
}
