//! 工具 payload 的宽松视图
//!
//! payload 对核心是不透明的 JSON；叙述只读取少量已知字段，缺失字段一律取默认值，
//! 形状完全不符时视为「无数据」而不是报错。

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::briefing::{AggregateSnapshot, ToolSlot};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetStatus {
    pub asset_id: String,
    pub asset_name: String,
    pub area_id: Option<String>,
    pub status: String,
    pub actual_output: Option<f64>,
    pub target_output: Option<f64>,
    pub variance_percent: Option<f64>,
}

impl AssetStatus {
    /// 显示名：asset_name 为空时用 asset_id
    pub fn label(&self) -> &str {
        if self.asset_name.is_empty() {
            &self.asset_id
        } else {
            &self.asset_name
        }
    }

    fn status_key(&self) -> String {
        self.status.trim().to_lowercase().replace([' ', '-'], "_")
    }

    pub fn is_ahead(&self) -> bool {
        matches!(self.status_key().as_str(), "ahead" | "ahead_of_target")
    }

    pub fn is_behind(&self) -> bool {
        matches!(self.status_key().as_str(), "behind" | "behind_target" | "behind_of_target")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductionView {
    pub assets: Vec<AssetStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SafetyEvent {
    pub asset_id: Option<String>,
    pub asset_name: Option<String>,
    pub severity: Option<String>,
    pub description: String,
    /// 缺省视为 active
    pub status: Option<String>,
}

impl SafetyEvent {
    pub fn is_active(&self) -> bool {
        !matches!(
            self.status.as_deref().map(str::to_lowercase).as_deref(),
            Some("resolved") | Some("closed")
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SafetyView {
    pub event_count: Option<u64>,
    pub events: Vec<SafetyEvent>,
}

impl SafetyView {
    /// 事件数：优先用 event_count，否则数 events
    pub fn count(&self) -> u64 {
        self.event_count.unwrap_or(self.events.len() as u64)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetOee {
    pub asset_id: String,
    pub asset_name: String,
    pub area_id: Option<String>,
    pub oee: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OeeView {
    pub assets: Vec<AssetOee>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DowntimeReason {
    pub reason: String,
    pub minutes: f64,
    pub asset_name: Option<String>,
    pub area_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DowntimeView {
    pub top_reasons: Vec<DowntimeReason>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionItem {
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionView {
    pub actions: Vec<ActionItem>,
}

impl ActionView {
    /// 同时接受 {"actions": [...]} 与顶层数组
    fn from_value(value: &Value) -> Option<Self> {
        if value.is_array() {
            let actions = serde_json::from_value(value.clone()).ok()?;
            return Some(Self { actions });
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// 非空推荐
    pub fn items(&self) -> impl Iterator<Item = &ActionItem> {
        self.actions
            .iter()
            .filter(|a| !a.recommendation.trim().is_empty())
    }
}

fn decode<T: DeserializeOwned>(snapshot: &AggregateSnapshot, slot: ToolSlot) -> Option<T> {
    let value = snapshot.data(slot)?;
    match serde_json::from_value(value.clone()) {
        Ok(view) => Some(view),
        Err(e) => {
            tracing::debug!(slot = %slot, error = %e, "Payload does not match expected shape");
            None
        }
    }
}

pub fn production(snapshot: &AggregateSnapshot) -> Option<ProductionView> {
    decode(snapshot, ToolSlot::ProductionStatus)
}

pub fn safety(snapshot: &AggregateSnapshot) -> Option<SafetyView> {
    decode(snapshot, ToolSlot::SafetyEvents)
}

pub fn oee(snapshot: &AggregateSnapshot) -> Option<OeeView> {
    decode(snapshot, ToolSlot::OeeData)
}

pub fn downtime(snapshot: &AggregateSnapshot) -> Option<DowntimeView> {
    decode(snapshot, ToolSlot::DowntimeAnalysis)
}

pub fn actions(snapshot: &AggregateSnapshot) -> Option<ActionView> {
    snapshot
        .data(ToolSlot::ActionList)
        .and_then(ActionView::from_value)
}
