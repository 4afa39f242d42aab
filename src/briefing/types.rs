//! 简报数据模型
//!
//! ToolOutcome / Citation / AggregateSnapshot / Section / BriefingResult / ResultMetadata，
//! 全部只在单次 generate_briefing 调用内存活；序列化形状与对外 JSON 接口一致。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 数据来源引用：由工具自行附加，核心只做聚合与去重，不修改字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    /// 置信度，范围 [0, 1]
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl Citation {
    pub fn new(source: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            table: Some(table.into()),
            record_id: None,
            asset_id: None,
            confidence: 1.0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_asset(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// 去重键：(source, table, record_id)
    pub fn dedup_key(&self) -> (&str, Option<&str>, Option<&str>) {
        (
            self.source.as_str(),
            self.table.as_deref(),
            self.record_id.as_deref(),
        )
    }

    /// 叙述中的内联标记，如 `[Source: safety_events]`；无 table 时用 source
    pub fn marker(&self) -> String {
        format!("[Source: {}]", self.table.as_deref().unwrap_or(&self.source))
    }
}

/// AggregateSnapshot 的固定槽位，每个槽位对应一个工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSlot {
    ProductionStatus,
    SafetyEvents,
    OeeData,
    DowntimeAnalysis,
    ActionList,
}

impl ToolSlot {
    /// 参考配置中的全部槽位（默认调用顺序）
    pub const ALL: [ToolSlot; 5] = [
        ToolSlot::ProductionStatus,
        ToolSlot::SafetyEvents,
        ToolSlot::OeeData,
        ToolSlot::DowntimeAnalysis,
        ToolSlot::ActionList,
    ];

    /// 槽位名（toolFailures 中报告的名称）
    pub fn name(self) -> &'static str {
        match self {
            ToolSlot::ProductionStatus => "productionStatus",
            ToolSlot::SafetyEvents => "safetyEvents",
            ToolSlot::OeeData => "oeeData",
            ToolSlot::DowntimeAnalysis => "downtimeAnalysis",
            ToolSlot::ActionList => "actionList",
        }
    }

    /// 解析配置中的槽位名，同时接受 camelCase 与 snake_case
    pub fn parse(name: &str) -> Option<ToolSlot> {
        let normalised = name.trim().replace(['_', '-'], "").to_lowercase();
        ToolSlot::ALL
            .into_iter()
            .find(|slot| slot.name().to_lowercase() == normalised)
    }

    fn index(self) -> usize {
        match self {
            ToolSlot::ProductionStatus => 0,
            ToolSlot::SafetyEvents => 1,
            ToolSlot::OeeData => 2,
            ToolSlot::DowntimeAnalysis => 3,
            ToolSlot::ActionList => 4,
        }
    }
}

impl std::fmt::Display for ToolSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 单次工具调用的结果，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub tool_name: String,
    pub slot: ToolSlot,
    pub success: bool,
    pub payload: Option<Value>,
    pub citations: Vec<Citation>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    /// 工具是否命中其私有缓存（仅用于 metadata.cache_hit 汇总）
    pub cache_hit: bool,
}

impl ToolOutcome {
    pub fn succeeded(
        tool_name: impl Into<String>,
        slot: ToolSlot,
        payload: Value,
        citations: Vec<Citation>,
        cache_hit: bool,
        duration_ms: u64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            slot,
            success: true,
            payload: Some(payload),
            citations,
            error_message: None,
            duration_ms,
            cache_hit,
        }
    }

    pub fn failed(
        tool_name: impl Into<String>,
        slot: ToolSlot,
        error_message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            slot,
            success: false,
            payload: None,
            citations: Vec::new(),
            error_message: Some(error_message.into()),
            duration_ms,
            cache_hit: false,
        }
    }

    /// 成功时返回 payload
    pub fn data(&self) -> Option<&Value> {
        if self.success {
            self.payload.as_ref()
        } else {
            None
        }
    }
}

/// 聚合快照：每个槽位至多写入一次；未写入（None）表示守卫在外层截止前未完成
#[derive(Debug, Clone, Default)]
pub struct AggregateSnapshot {
    slots: [Option<ToolOutcome>; 5],
    expected: Vec<ToolSlot>,
}

impl AggregateSnapshot {
    /// 创建空快照，expected 为本次应当到达的槽位（按注册顺序）
    pub fn new(expected: Vec<ToolSlot>) -> Self {
        Self {
            slots: Default::default(),
            expected,
        }
    }

    /// 写入槽位；已写入的槽位不会被覆盖，返回 false
    pub fn record(&mut self, outcome: ToolOutcome) -> bool {
        let entry = &mut self.slots[outcome.slot.index()];
        if entry.is_some() {
            tracing::warn!(slot = %outcome.slot, "Slot already written, discarding late outcome");
            return false;
        }
        *entry = Some(outcome);
        true
    }

    pub fn get(&self, slot: ToolSlot) -> Option<&ToolOutcome> {
        self.slots[slot.index()].as_ref()
    }

    /// 槽位成功时的 payload
    pub fn data(&self, slot: ToolSlot) -> Option<&Value> {
        self.get(slot).and_then(ToolOutcome::data)
    }

    pub fn expected(&self) -> &[ToolSlot] {
        &self.expected
    }

    /// 按 expected 顺序返回已到达的结果
    pub fn outcomes(&self) -> impl Iterator<Item = &ToolOutcome> {
        self.expected.iter().filter_map(|slot| self.get(*slot))
    }

    /// 仍未到达的槽位
    pub fn absent(&self) -> Vec<ToolSlot> {
        self.expected
            .iter()
            .copied()
            .filter(|slot| self.get(*slot).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes().next().is_none()
    }

    /// 所有槽位都已到达（无论成功与否）
    pub fn is_complete(&self) -> bool {
        self.absent().is_empty()
    }
}

/// 简报作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefingScope {
    Plant,
    Area,
    /// 仅用于 TotalFailure 的结果
    Error,
}

/// 传给每个工具的参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeArgs {
    pub user_id: String,
    pub scope: BriefingScope,
    pub area_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Headline,
    Wins,
    Concerns,
    Actions,
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Pending,
    Complete,
    Partial,
    Failed,
    TimedOut,
}

/// 段落内的单个指标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }
}

/// 简报段落：由生产者一次性创建，之后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub section_type: SectionType,
    pub title: String,
    pub content: String,
    pub metrics: Vec<Metric>,
    pub citations: Vec<Citation>,
    pub status: SectionStatus,
    pub pause_point: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Section {
    pub fn new(
        section_type: SectionType,
        title: impl Into<String>,
        content: impl Into<String>,
        status: SectionStatus,
    ) -> Self {
        Self {
            section_type,
            title: title.into(),
            content: content.into(),
            metrics: Vec::new(),
            citations: Vec::new(),
            status,
            pause_point: false,
            area_id: None,
            error_message: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn with_area(mut self, area_id: impl Into<String>) -> Self {
        self.area_id = Some(area_id.into());
        self
    }

    pub fn with_error(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    pub(crate) fn with_pause_point(mut self, pause_point: bool) -> Self {
        self.pause_point = pause_point;
        self
    }
}

/// 结果元数据：完全由快照与段落派生
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultMetadata {
    pub generated_at: DateTime<Utc>,
    pub generation_duration_ms: u64,
    /// [0, 100]
    pub completion_percentage: f64,
    pub timed_out: bool,
    pub tool_failures: Vec<String>,
    pub cache_hit: bool,
}

/// 单次 generate_briefing 的返回值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BriefingResult {
    pub id: String,
    pub title: String,
    pub scope: BriefingScope,
    pub sections: Vec<Section>,
    #[serde(rename = "audio_stream_url")]
    pub audio_url: Option<String>,
    #[serde(rename = "total_duration_estimate")]
    pub duration_estimate_sec: u64,
    pub citations: Vec<Citation>,
    pub metadata: ResultMetadata,
}
