//! 简报运行参数（由配置换算为 Duration）

use std::time::Duration;

use crate::briefing::narrative::WinsPolicy;
use crate::briefing::ToolSlot;
use crate::config::BriefingSection;
use crate::core::BriefingError;

#[derive(Debug, Clone)]
pub struct BriefingOptions {
    /// 单工具超时
    pub per_tool_budget: Duration,
    /// 整次简报（编排 + 叙述）超时，与 per_tool_budget 是两个独立的截止
    pub total_budget: Duration,
    /// 按顺序调用的槽位
    pub slots: Vec<ToolSlot>,
    pub wins_policy: WinsPolicy,
    pub audio_requested: bool,
}

impl Default for BriefingOptions {
    fn default() -> Self {
        Self {
            per_tool_budget: Duration::from_secs(5),
            total_budget: Duration::from_secs(30),
            slots: ToolSlot::ALL.to_vec(),
            wins_policy: WinsPolicy::default(),
            audio_requested: false,
        }
    }
}

impl BriefingOptions {
    pub fn from_config(section: &BriefingSection) -> Result<Self, BriefingError> {
        let per_tool_budget = secs(section.per_tool_timeout_secs, "per_tool_timeout_secs")?;
        let total_budget = secs(section.total_timeout_secs, "total_timeout_secs")?;
        if total_budget <= per_tool_budget {
            tracing::warn!(
                per_tool_secs = section.per_tool_timeout_secs,
                total_secs = section.total_timeout_secs,
                "Total budget should be well above the per-tool budget"
            );
        }

        let mut slots = Vec::with_capacity(section.tools.len());
        for name in &section.tools {
            let slot = ToolSlot::parse(name)
                .ok_or_else(|| BriefingError::Config(format!("unknown tool slot: {}", name)))?;
            if !slots.contains(&slot) {
                slots.push(slot);
            }
        }

        Ok(Self {
            per_tool_budget,
            total_budget,
            slots,
            wins_policy: WinsPolicy::from_flag(section.always_emit_wins),
            audio_requested: section.audio_requested,
        })
    }
}

fn secs(value: f64, key: &str) -> Result<Duration, BriefingError> {
    if value <= 0.0 {
        return Err(BriefingError::Config(format!("{} must be positive", key)));
    }
    Duration::try_from_secs_f64(value).map_err(|e| BriefingError::Config(format!("{}: {}", key, e)))
}
