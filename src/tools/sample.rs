//! 示例数据源
//!
//! SampleTool 返回固定 payload 与引用，可选人为延迟、脚本化错误或 panic，
//! 供 CLI 离线演示与测试使用；sample_registry 构建参考配置的五个槽位。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::briefing::{Citation, ScopeArgs, ToolSlot};
use crate::core::BriefingError;
use crate::tools::{BriefingTool, ToolOutput, ToolRegistry};

#[derive(Debug, Clone)]
enum Behaviour {
    Succeed,
    Fail(String),
    Panic,
}

/// 固定数据工具
#[derive(Debug, Clone)]
pub struct SampleTool {
    name: String,
    slot: ToolSlot,
    payload: Value,
    citations: Vec<Citation>,
    delay: Option<Duration>,
    cache_hit: bool,
    behaviour: Behaviour,
}

impl SampleTool {
    pub fn new(name: impl Into<String>, slot: ToolSlot, payload: Value) -> Self {
        Self {
            name: name.into(),
            slot,
            payload,
            citations: Vec::new(),
            delay: None,
            cache_hit: false,
            behaviour: Behaviour::Succeed,
        }
    }

    /// 追加一条指向 table 的引用
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.citations.push(Citation::new("plant_db", table));
        self
    }

    pub fn with_citation(mut self, citation: Citation) -> Self {
        self.citations.push(citation);
        self
    }

    /// 返回前先 sleep
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn cached(mut self) -> Self {
        self.cache_hit = true;
        self
    }

    /// 返回 Err(message)
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.behaviour = Behaviour::Fail(message.into());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.behaviour = Behaviour::Panic;
        self
    }
}

#[async_trait]
impl BriefingTool for SampleTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn slot(&self) -> ToolSlot {
        self.slot
    }

    async fn fetch(&self, _args: &ScopeArgs) -> Result<ToolOutput, String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behaviour {
            Behaviour::Succeed => {
                let output = ToolOutput::new(self.payload.clone(), self.citations.clone());
                Ok(if self.cache_hit { output.cached() } else { output })
            }
            Behaviour::Fail(message) => Err(message.clone()),
            Behaviour::Panic => panic!("{} exploded", self.name),
        }
    }
}

pub fn sample_production_status() -> Value {
    json!({
        "assets": [
            {"asset_id": "line-1", "asset_name": "Packaging Line 1", "area_id": "packaging",
             "status": "ahead", "actual_output": 1180, "target_output": 1100, "variance_percent": 7.3},
            {"asset_id": "line-2", "asset_name": "Packaging Line 2", "area_id": "packaging",
             "status": "on_target", "actual_output": 1002, "target_output": 1000, "variance_percent": 0.2},
            {"asset_id": "press-4", "asset_name": "Press 4", "area_id": "stamping",
             "status": "behind", "actual_output": 610, "target_output": 800, "variance_percent": -23.8}
        ]
    })
}

pub fn sample_safety_events() -> Value {
    json!({"event_count": 0, "events": []})
}

pub fn sample_oee_data() -> Value {
    json!({
        "overall_oee": 78.4,
        "assets": [
            {"asset_id": "line-1", "asset_name": "Packaging Line 1", "area_id": "packaging", "oee": 86.1},
            {"asset_id": "line-2", "asset_name": "Packaging Line 2", "area_id": "packaging", "oee": 81.0},
            {"asset_id": "press-4", "asset_name": "Press 4", "area_id": "stamping", "oee": 58.7}
        ]
    })
}

pub fn sample_downtime_analysis() -> Value {
    json!({
        "total_downtime_minutes": 95,
        "top_reasons": [
            {"reason": "Die change overrun", "minutes": 55, "asset_name": "Press 4", "area_id": "stamping"},
            {"reason": "Film jam", "minutes": 40, "asset_name": "Packaging Line 2", "area_id": "packaging"}
        ]
    })
}

pub fn sample_action_list() -> Value {
    json!({
        "actions": [
            {"priority": 1, "asset_name": "Press 4",
             "recommendation": "Review the die change procedure on Press 4 with the shift lead"},
            {"priority": 2, "asset_name": "Packaging Line 2",
             "recommendation": "Inspect the film feed rollers on Packaging Line 2"}
        ]
    })
}

/// 参考配置：五个槽位各一个固定数据工具
pub fn sample_registry() -> Result<ToolRegistry, BriefingError> {
    let mut registry = ToolRegistry::new();
    registry.register(
        SampleTool::new("production_status", ToolSlot::ProductionStatus, sample_production_status())
            .with_table("production_output"),
    )?;
    registry.register(
        SampleTool::new("safety_events", ToolSlot::SafetyEvents, sample_safety_events())
            .with_table("safety_events"),
    )?;
    registry.register(
        SampleTool::new("oee_data", ToolSlot::OeeData, sample_oee_data()).with_table("oee_daily"),
    )?;
    registry.register(
        SampleTool::new("downtime_analysis", ToolSlot::DowntimeAnalysis, sample_downtime_analysis())
            .with_table("downtime_events"),
    )?;
    registry.register(
        SampleTool::new("action_list", ToolSlot::ActionList, sample_action_list())
            .with_table("action_items"),
    )?;
    Ok(registry)
}
