//! 兜底段落构建
//!
//! 全局截止触发时直接从原始快照构建最小段落集，不经过任何叙述措辞：
//! 至少一个槽位到达 → headline（+ 原样的 actions）；全部缺失 → 单个说明段落。

use crate::briefing::narrative::template::{citations_of, markers_of};
use crate::briefing::narrative::views;
use crate::briefing::{AggregateSnapshot, Metric, Section, SectionStatus, SectionType, ToolSlot};

pub fn build_fallback_sections(snapshot: &AggregateSnapshot) -> Vec<Section> {
    if snapshot.is_empty() {
        return vec![Section::new(
            SectionType::Headline,
            "Briefing Incomplete",
            "No data sources responded before the briefing deadline. Please try again shortly.",
            SectionStatus::TimedOut,
        )
        .with_error("all data sources were still pending at the deadline")];
    }

    let expected = snapshot.expected().len();
    let succeeded = snapshot.outcomes().filter(|o| o.success).count();
    let degraded = succeeded < expected;

    let mut content = format!(
        "Limited briefing: {} of {} data sources responded in time.",
        succeeded, expected
    );
    let mut metrics = vec![Metric::new("sources_available", succeeded as f64, "sources")
        .with_target(expected as f64)];
    if let Some(safety) = views::safety(snapshot) {
        content.push_str(&format!(" Safety events reported: {}.", safety.count()));
        let markers = markers_of(snapshot, ToolSlot::SafetyEvents);
        if !markers.is_empty() {
            content.push(' ');
            content.push_str(&markers);
        }
        metrics.push(Metric::new("safety_events", safety.count() as f64, "events"));
    }

    let status = if degraded {
        SectionStatus::Partial
    } else {
        SectionStatus::Complete
    };
    let mut sections = vec![Section::new(SectionType::Headline, "Headline", content, status)
        .with_metrics(metrics)
        .with_citations(citations_of(snapshot, &[ToolSlot::SafetyEvents]))];

    if let Some(actions) = views::actions(snapshot) {
        let lines: Vec<String> = actions
            .items()
            .map(|item| format!("- {}", item.recommendation.trim()))
            .collect();
        if !lines.is_empty() {
            sections.push(
                Section::new(
                    SectionType::Actions,
                    "Actions",
                    lines.join("\n"),
                    SectionStatus::Complete,
                )
                .with_citations(citations_of(snapshot, &[ToolSlot::ActionList])),
            );
        }
    }

    sections
}
