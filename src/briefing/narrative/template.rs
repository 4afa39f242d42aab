//! 模板路径：确定性地从快照生成段落
//!
//! 纯函数：相同快照与 WinsPolicy 产出逐字节相同的内容；所有段落 status 均为 complete。

use crate::briefing::narrative::views::{self, AssetStatus};
use crate::briefing::{
    AggregateSnapshot, Citation, Metric, Section, SectionStatus, SectionType, ToolSlot,
};

/// 没有资产超前于目标时 wins 段的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WinsPolicy {
    /// 整段省略
    Omit,
    /// 输出一句明确的「暂无亮点」
    #[default]
    ExplicitSentence,
}

impl WinsPolicy {
    pub fn from_flag(always_emit_wins: bool) -> Self {
        if always_emit_wins {
            WinsPolicy::ExplicitSentence
        } else {
            WinsPolicy::Omit
        }
    }
}

pub(crate) const NO_WINS: &str = "No assets are ahead of target yet this shift.";
pub(crate) const NO_PRODUCTION: &str =
    "Production data was unavailable, so no wins can be reported.";
pub(crate) const NO_CONCERNS: &str = "No major concerns to report.";

/// 按模板生成全部段落：headline、wins?、concerns、actions?、area?
pub fn template_sections(
    snapshot: &AggregateSnapshot,
    wins_policy: WinsPolicy,
    area_id: Option<&str>,
) -> Vec<Section> {
    let mut sections = vec![headline(snapshot)];
    sections.extend(wins(snapshot, wins_policy));
    sections.push(concerns(snapshot));
    sections.extend(actions(snapshot));
    if let Some(area_id) = area_id {
        sections.extend(area(snapshot, area_id));
    }
    sections
}

/// 某槽位结果携带的引用
pub(crate) fn citations_of(snapshot: &AggregateSnapshot, slots: &[ToolSlot]) -> Vec<Citation> {
    slots
        .iter()
        .filter_map(|slot| snapshot.get(*slot))
        .flat_map(|outcome| outcome.citations.iter().cloned())
        .collect()
}

/// 某槽位引用的内联标记，去重并保持顺序，以空格连接
pub(crate) fn markers_of(snapshot: &AggregateSnapshot, slot: ToolSlot) -> String {
    let mut markers: Vec<String> = Vec::new();
    for citation in citations_of(snapshot, &[slot]) {
        let marker = citation.marker();
        if !markers.contains(&marker) {
            markers.push(marker);
        }
    }
    markers.join(" ")
}

fn with_markers(sentence: String, markers: &str) -> String {
    if markers.is_empty() {
        sentence
    } else {
        format!("{} {}", sentence, markers)
    }
}

fn plural(count: u64, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{} {}", count, one)
    } else {
        format!("{} {}", count, many)
    }
}

pub(crate) fn headline_metrics(snapshot: &AggregateSnapshot) -> Vec<Metric> {
    views::safety(snapshot)
        .map(|s| vec![Metric::new("safety_events", s.count() as f64, "events")])
        .unwrap_or_default()
}

/// headline：来自安全槽位
pub fn headline(snapshot: &AggregateSnapshot) -> Section {
    let markers = markers_of(snapshot, ToolSlot::SafetyEvents);
    let sentence = match views::safety(snapshot) {
        Some(view) if view.count() == 0 => {
            "No safety incidents reported. The plant is running safely.".to_string()
        }
        Some(view) => format!(
            "{} reported and need attention today.",
            plural(view.count(), "safety incident was", "safety incidents were")
        ),
        None => "Safety status is unknown: safety data was unavailable for this briefing."
            .to_string(),
    };

    Section::new(
        SectionType::Headline,
        "Headline",
        with_markers(sentence, &markers),
        SectionStatus::Complete,
    )
    .with_metrics(headline_metrics(snapshot))
    .with_citations(citations_of(snapshot, &[ToolSlot::SafetyEvents]))
}

fn output_detail(asset: &AssetStatus) -> String {
    let mut detail = String::new();
    if let (Some(actual), Some(target)) = (asset.actual_output, asset.target_output) {
        detail.push_str(&format!(" at {} of {} units", actual, target));
    }
    if let Some(variance) = asset.variance_percent {
        detail.push_str(&format!(" ({:+.1}%)", variance));
    }
    detail
}

fn output_metric(asset: &AssetStatus) -> Option<Metric> {
    let actual = asset.actual_output?;
    let metric = Metric::new(format!("{} output", asset.label()), actual, "units");
    Some(match asset.target_output {
        Some(target) => metric.with_target(target),
        None => metric,
    })
}

pub(crate) fn wins_metrics(snapshot: &AggregateSnapshot) -> Vec<Metric> {
    views::production(snapshot)
        .map(|p| {
            p.assets
                .iter()
                .filter(|a| a.is_ahead())
                .filter_map(output_metric)
                .collect()
        })
        .unwrap_or_default()
}

/// wins：超前于目标的资产；没有时按 WinsPolicy 省略或给出明确句子
pub fn wins(snapshot: &AggregateSnapshot, policy: WinsPolicy) -> Option<Section> {
    let markers = markers_of(snapshot, ToolSlot::ProductionStatus);
    let production = views::production(snapshot);

    let lines: Vec<String> = production
        .iter()
        .flat_map(|p| p.assets.iter())
        .filter(|a| a.is_ahead())
        .map(|a| {
            with_markers(
                format!("{} is ahead of target{}.", a.label(), output_detail(a)),
                &markers,
            )
        })
        .collect();

    let content = if !lines.is_empty() {
        lines.join("\n")
    } else {
        match (policy, production.is_some()) {
            (WinsPolicy::Omit, _) => return None,
            (WinsPolicy::ExplicitSentence, true) => with_markers(NO_WINS.to_string(), &markers),
            (WinsPolicy::ExplicitSentence, false) => NO_PRODUCTION.to_string(),
        }
    };

    Some(
        Section::new(SectionType::Wins, "Wins", content, SectionStatus::Complete)
            .with_metrics(wins_metrics(snapshot))
            .with_citations(citations_of(snapshot, &[ToolSlot::ProductionStatus])),
    )
}

pub(crate) fn concerns_metrics(snapshot: &AggregateSnapshot) -> Vec<Metric> {
    views::production(snapshot)
        .map(|p| {
            p.assets
                .iter()
                .filter(|a| a.is_behind())
                .filter_map(output_metric)
                .collect()
        })
        .unwrap_or_default()
}

/// concerns：落后于目标的资产 + 未关闭的安全事件；都没有时给出一句「无重大问题」
pub fn concerns(snapshot: &AggregateSnapshot) -> Section {
    let mut lines: Vec<String> = Vec::new();

    if let Some(production) = views::production(snapshot) {
        let markers = markers_of(snapshot, ToolSlot::ProductionStatus);
        for asset in production.assets.iter().filter(|a| a.is_behind()) {
            lines.push(with_markers(
                format!("{} is behind target{}.", asset.label(), output_detail(asset)),
                &markers,
            ));
        }
    }

    if let Some(safety) = views::safety(snapshot) {
        let markers = markers_of(snapshot, ToolSlot::SafetyEvents);
        for event in safety.events.iter().filter(|e| e.is_active()) {
            let mut sentence = format!("Safety: {}", event.description.trim_end_matches('.'));
            if let Some(severity) = &event.severity {
                sentence.push_str(&format!(" ({} severity)", severity));
            }
            if let Some(asset) = event.asset_name.as_ref().or(event.asset_id.as_ref()) {
                sentence.push_str(&format!(" on {}", asset));
            }
            sentence.push('.');
            lines.push(with_markers(sentence, &markers));
        }
    }

    let content = if lines.is_empty() {
        NO_CONCERNS.to_string()
    } else {
        lines.join("\n")
    };

    Section::new(SectionType::Concerns, "Concerns", content, SectionStatus::Complete)
        .with_metrics(concerns_metrics(snapshot))
        .with_citations(citations_of(
            snapshot,
            &[ToolSlot::ProductionStatus, ToolSlot::SafetyEvents],
        ))
}

pub(crate) fn actions_metrics(snapshot: &AggregateSnapshot) -> Vec<Metric> {
    views::actions(snapshot)
        .map(|a| vec![Metric::new("open_actions", a.items().count() as f64, "items")])
        .unwrap_or_default()
}

/// actions：按 1..N 编号；槽位缺失或为空时省略
pub fn actions(snapshot: &AggregateSnapshot) -> Option<Section> {
    let view = views::actions(snapshot)?;
    let markers = markers_of(snapshot, ToolSlot::ActionList);

    let lines: Vec<String> = view
        .items()
        .enumerate()
        .map(|(i, item)| {
            with_markers(
                format!("{}. {}", i + 1, item.recommendation.trim()),
                &markers,
            )
        })
        .collect();
    if lines.is_empty() {
        return None;
    }

    Some(
        Section::new(
            SectionType::Actions,
            "Actions",
            lines.join("\n"),
            SectionStatus::Complete,
        )
        .with_metrics(actions_metrics(snapshot))
        .with_citations(citations_of(snapshot, &[ToolSlot::ActionList])),
    )
}

/// area：区域简报的 OEE 与停机摘要；两个槽位都没有该区域数据时省略
pub fn area(snapshot: &AggregateSnapshot, area_id: &str) -> Option<Section> {
    let in_area = |id: &Option<String>| id.as_deref() == Some(area_id);
    let mut lines = Vec::new();
    let mut metrics = Vec::new();

    if let Some(oee) = views::oee(snapshot) {
        let markers = markers_of(snapshot, ToolSlot::OeeData);
        for asset in oee.assets.iter().filter(|a| in_area(&a.area_id)) {
            let label = if asset.asset_name.is_empty() {
                &asset.asset_id
            } else {
                &asset.asset_name
            };
            lines.push(with_markers(
                format!("{} OEE is {:.1}%.", label, asset.oee),
                &markers,
            ));
            metrics.push(Metric::new(format!("{} OEE", label), asset.oee, "%"));
        }
    }

    if let Some(downtime) = views::downtime(snapshot) {
        let markers = markers_of(snapshot, ToolSlot::DowntimeAnalysis);
        let mut area_minutes = 0.0;
        for reason in downtime.top_reasons.iter().filter(|r| in_area(&r.area_id)) {
            let mut sentence = format!("{} cost {} minutes", reason.reason, reason.minutes);
            if let Some(asset) = &reason.asset_name {
                sentence.push_str(&format!(" on {}", asset));
            }
            sentence.push('.');
            lines.push(with_markers(sentence, &markers));
            area_minutes += reason.minutes;
        }
        if area_minutes > 0.0 {
            metrics.push(Metric::new("downtime", area_minutes, "minutes"));
        }
    }

    if lines.is_empty() {
        return None;
    }

    Some(
        Section::new(
            SectionType::Area,
            format!("Area: {}", area_id),
            lines.join("\n"),
            SectionStatus::Complete,
        )
        .with_metrics(metrics)
        .with_citations(citations_of(
            snapshot,
            &[ToolSlot::OeeData, ToolSlot::DowntimeAnalysis],
        ))
        .with_area(area_id),
    )
}
