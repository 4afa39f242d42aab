//! 工具注册表
//!
//! 所有数据源实现 BriefingTool trait（name / slot / fetch），由 ToolRegistry 按注册顺序保存，
//! 每个槽位只允许一个工具；ToolExecutor 在调用时加超时并统一转为 ToolOutcome。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::briefing::{Citation, ScopeArgs, ToolSlot};
use crate::core::BriefingError;

/// 工具返回的结构化数据
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub payload: Value,
    pub citations: Vec<Citation>,
    /// 是否由工具私有缓存直接返回
    pub cache_hit: bool,
}

impl ToolOutput {
    pub fn new(payload: Value, citations: Vec<Citation>) -> Self {
        Self {
            payload,
            citations,
            cache_hit: false,
        }
    }

    pub fn cached(mut self) -> Self {
        self.cache_hit = true;
        self
    }
}

/// 数据源 trait：名称、对应槽位、异步拉取（可能失败、可能很慢）
#[async_trait]
pub trait BriefingTool: Send + Sync {
    /// 工具名称（用于日志与 ToolOutcome.tool_name）
    fn name(&self) -> &str;

    /// 写入 AggregateSnapshot 的槽位
    fn slot(&self) -> ToolSlot;

    /// 拉取数据
    async fn fetch(&self, args: &ScopeArgs) -> Result<ToolOutput, String>;
}

/// 工具注册表：按注册顺序存储 Arc<dyn BriefingTool>，槽位唯一
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn BriefingTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；槽位已被占用时返回 DuplicateSlot
    pub fn register(&mut self, tool: impl BriefingTool + 'static) -> Result<(), BriefingError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn BriefingTool>) -> Result<(), BriefingError> {
        let slot = tool.slot();
        if self.get(slot).is_some() {
            return Err(BriefingError::DuplicateSlot(slot.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, slot: ToolSlot) -> Option<Arc<dyn BriefingTool>> {
        self.tools.iter().find(|t| t.slot() == slot).cloned()
    }

    /// 按 slots 的顺序保留工具，其余丢弃（对应配置中的工具列表）
    pub fn retain_slots(&mut self, slots: &[ToolSlot]) {
        let mut ordered = Vec::with_capacity(slots.len());
        for slot in slots {
            match self.get(*slot) {
                Some(tool) => ordered.push(tool),
                None => tracing::warn!(slot = %slot, "Configured slot has no registered tool"),
            }
        }
        self.tools = ordered;
    }

    pub fn tools(&self) -> &[Arc<dyn BriefingTool>] {
        &self.tools
    }

    /// 已注册的槽位（注册顺序）
    pub fn slots(&self) -> Vec<ToolSlot> {
        self.tools.iter().map(|t| t.slot()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::SampleTool;

    #[test]
    fn test_duplicate_slot_rejected() {
        let mut registry = ToolRegistry::new();
        registry
            .register(SampleTool::new("oee", ToolSlot::OeeData, serde_json::json!({})))
            .unwrap();
        let err = registry
            .register(SampleTool::new("oee_v2", ToolSlot::OeeData, serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(err, BriefingError::DuplicateSlot(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_retain_slots_reorders() {
        let mut registry = ToolRegistry::new();
        registry
            .register(SampleTool::new("safety", ToolSlot::SafetyEvents, serde_json::json!({})))
            .unwrap();
        registry
            .register(SampleTool::new("actions", ToolSlot::ActionList, serde_json::json!({})))
            .unwrap();
        registry
            .register(SampleTool::new("oee", ToolSlot::OeeData, serde_json::json!({})))
            .unwrap();

        registry.retain_slots(&[ToolSlot::ActionList, ToolSlot::SafetyEvents, ToolSlot::DowntimeAnalysis]);

        assert_eq!(registry.slots(), vec![ToolSlot::ActionList, ToolSlot::SafetyEvents]);
        let names: Vec<&str> = registry.tools().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["actions", "safety"]);
    }
}
