//! 响应组装
//!
//! 计算完成度（相对预期段落集）、失败工具列表、引用并集（按 (source, table, record_id) 去重），
//! 生成最终 BriefingResult。
//! 元数据完全由快照与段落派生。

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;

use crate::briefing::narrative::WinsPolicy;
use crate::briefing::{
    AggregateSnapshot, BriefingResult, BriefingScope, Citation, ResultMetadata, Section,
    SectionStatus, SectionType,
};

/// 朗读语速（词/分钟），用于估算时长
const WORDS_PER_MINUTE: f64 = 150.0;

/// 组装所需的调用上下文
#[derive(Debug, Clone)]
pub struct AssemblyContext {
    pub id: String,
    pub scope: BriefingScope,
    pub area_id: Option<String>,
    pub started_at: Instant,
    pub timed_out: bool,
    pub audio_url: Option<String>,
    /// 完成度的分母，见 expected_sections
    pub expected_sections: Vec<SectionType>,
}

/// 本次简报预期输出的段落类型：headline、concerns、actions 恒在；
/// wins 仅在 ExplicitSentence 策略下必出；区域简报另加 area
pub fn expected_sections(wins_policy: WinsPolicy, scope: BriefingScope) -> Vec<SectionType> {
    let mut expected = vec![SectionType::Headline];
    if wins_policy == WinsPolicy::ExplicitSentence {
        expected.push(SectionType::Wins);
    }
    expected.push(SectionType::Concerns);
    expected.push(SectionType::Actions);
    if scope == BriefingScope::Area {
        expected.push(SectionType::Area);
    }
    expected
}

pub fn assemble(
    sections: Vec<Section>,
    snapshot: &AggregateSnapshot,
    ctx: AssemblyContext,
) -> BriefingResult {
    let last = sections.len().saturating_sub(1);
    let sections: Vec<Section> = sections
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.with_pause_point(i < last))
        .collect();

    let metadata = ResultMetadata {
        generated_at: Utc::now(),
        generation_duration_ms: ctx.started_at.elapsed().as_millis() as u64,
        completion_percentage: completion_percentage(&sections, &ctx.expected_sections),
        timed_out: ctx.timed_out,
        tool_failures: tool_failures(snapshot),
        cache_hit: cache_hit(snapshot),
    };

    BriefingResult {
        id: ctx.id,
        title: title(ctx.scope, ctx.area_id.as_deref()),
        scope: ctx.scope,
        duration_estimate_sec: duration_estimate_sec(&sections),
        sections,
        audio_url: ctx.audio_url,
        citations: collect_citations(snapshot),
        metadata,
    }
}

/// TotalFailure 的结果：单个 failed 段落，scope 为 error
pub fn error_result(message: &str, started_at: Instant) -> BriefingResult {
    let section = Section::new(
        SectionType::Headline,
        "Briefing Unavailable",
        "The briefing could not be generated. Please try again.",
        SectionStatus::Failed,
    )
    .with_error(message);

    BriefingResult {
        id: uuid::Uuid::new_v4().to_string(),
        title: "Briefing Unavailable".to_string(),
        scope: BriefingScope::Error,
        duration_estimate_sec: duration_estimate_sec(std::slice::from_ref(&section)),
        sections: vec![section],
        audio_url: None,
        citations: Vec::new(),
        metadata: ResultMetadata {
            generated_at: Utc::now(),
            generation_duration_ms: started_at.elapsed().as_millis() as u64,
            completion_percentage: 0.0,
            timed_out: false,
            tool_failures: Vec::new(),
            cache_hit: false,
        },
    }
}

fn title(scope: BriefingScope, area_id: Option<&str>) -> String {
    match (scope, area_id) {
        (BriefingScope::Area, Some(area_id)) => format!("Area Briefing: {}", area_id),
        (BriefingScope::Error, _) => "Briefing Unavailable".to_string(),
        _ => "Plant Briefing".to_string(),
    }
}

/// complete 段落占预期段落的百分比；预期之外实际输出的段落类型（如 Omit 策略下的 wins）并入分母
pub fn completion_percentage(sections: &[Section], expected: &[SectionType]) -> f64 {
    let mut denominator = expected.to_vec();
    for section in sections {
        if !denominator.contains(&section.section_type) {
            denominator.push(section.section_type);
        }
    }
    if denominator.is_empty() {
        return 0.0;
    }
    let complete = sections
        .iter()
        .filter(|s| s.status == SectionStatus::Complete)
        .count();
    (complete as f64 / denominator.len() as f64 * 100.0).clamp(0.0, 100.0)
}

/// 失败与缺失的槽位名（按注册顺序）
pub fn tool_failures(snapshot: &AggregateSnapshot) -> Vec<String> {
    snapshot
        .expected()
        .iter()
        .filter(|slot| snapshot.get(**slot).map_or(true, |o| !o.success))
        .map(|slot| slot.name().to_string())
        .collect()
}

/// 所有已到达结果的引用并集，首次出现者保留
pub fn collect_citations(snapshot: &AggregateSnapshot) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    for citation in snapshot.outcomes().flat_map(|o| o.citations.iter()) {
        let key = citation.dedup_key();
        if seen.insert((
            key.0.to_string(),
            key.1.map(str::to_string),
            key.2.map(str::to_string),
        )) {
            citations.push(citation.clone());
        }
    }
    citations
}

fn cache_hit(snapshot: &AggregateSnapshot) -> bool {
    let mut successes = snapshot.outcomes().filter(|o| o.success).peekable();
    successes.peek().is_some() && successes.all(|o| o.cache_hit)
}

fn duration_estimate_sec(sections: &[Section]) -> u64 {
    let words: usize = sections
        .iter()
        .map(|s| s.title.split_whitespace().count() + s.content.split_whitespace().count())
        .sum();
    ((words as f64 / WORDS_PER_MINUTE * 60.0).round() as u64).max(1)
}
