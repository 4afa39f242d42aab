//! 工具执行器（单工具超时守卫）
//!
//! run_with_timeout 在 per_tool_budget 内调用工具：成功包装为 ToolOutcome{success:true}，
//! 返回 Err 时原样记录错误文本，panic 记录 panic 信息，超时则丢弃在途 future 并立即返回 "<tool> timed out"。
//! 守卫从不重试，也从不向调用方传播错误；每次调用输出结构化审计日志（JSON）。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::time::timeout;

use crate::briefing::{ScopeArgs, ToolOutcome};
use crate::core::BriefingError;
use crate::tools::BriefingTool;

/// 工具执行器：持有单工具超时
#[derive(Debug, Clone, Copy)]
pub struct ToolExecutor {
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(per_tool_budget: Duration) -> Self {
        Self {
            timeout: per_tool_budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.timeout
    }

    /// 在超时内执行工具并转为 ToolOutcome
    pub async fn execute(&self, tool: Arc<dyn BriefingTool>, args: ScopeArgs) -> ToolOutcome {
        run_with_timeout(tool, args, self.timeout).await
    }
}

/// 单工具守卫：永不失败，所有异常都落在返回的 ToolOutcome 里
pub async fn run_with_timeout(
    tool: Arc<dyn BriefingTool>,
    args: ScopeArgs,
    per_tool_budget: Duration,
) -> ToolOutcome {
    let start = Instant::now();
    let tool_name = tool.name().to_string();
    let slot = tool.slot();

    let result = timeout(
        per_tool_budget,
        AssertUnwindSafe(tool.fetch(&args)).catch_unwind(),
    )
    .await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let outcome_kind = match &result {
        Ok(Ok(Ok(_))) => "ok",
        Ok(Ok(Err(_))) => "error",
        Ok(Err(_)) => "panic",
        Err(_) => "timeout",
    };
    let outcome = match result {
        Ok(Ok(Ok(output))) => ToolOutcome::succeeded(
            &tool_name,
            slot,
            output.payload,
            output.citations,
            output.cache_hit,
            duration_ms,
        ),
        Ok(Ok(Err(e))) => ToolOutcome::failed(&tool_name, slot, e, duration_ms),
        Ok(Err(panic)) => {
            ToolOutcome::failed(&tool_name, slot, panic_message(panic.as_ref()), duration_ms)
        }
        Err(_) => {
            let err = BriefingError::ToolTimeout(tool_name.clone());
            ToolOutcome::failed(&tool_name, slot, err.to_string(), duration_ms)
        }
    };

    let audit = serde_json::json!({
        "event": "tool_audit",
        "tool": tool_name,
        "slot": slot.name(),
        "ok": outcome.success,
        "outcome": outcome_kind,
        "duration_ms": duration_ms,
        "user_id": args.user_id,
    });
    tracing::info!(audit = %audit.to_string(), "tool");

    outcome
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::{BriefingScope, ToolSlot};
    use crate::tools::SampleTool;

    fn args() -> ScopeArgs {
        ScopeArgs {
            user_id: "u1".to_string(),
            scope: BriefingScope::Plant,
            area_id: None,
        }
    }

    #[tokio::test]
    async fn test_success_wraps_payload() {
        let tool = SampleTool::new("oee", ToolSlot::OeeData, serde_json::json!({"overall_oee": 81.0}))
            .with_table("oee_daily");
        let outcome = run_with_timeout(Arc::new(tool), args(), Duration::from_millis(200)).await;

        assert!(outcome.success);
        assert_eq!(outcome.payload.unwrap()["overall_oee"], 81.0);
        assert_eq!(outcome.citations.len(), 1);
        assert!(outcome.error_message.is_none());
    }

    #[tokio::test]
    async fn test_error_is_isolated() {
        let tool = SampleTool::new("safety", ToolSlot::SafetyEvents, serde_json::json!({}))
            .failing("connection refused");
        let outcome = run_with_timeout(Arc::new(tool), args(), Duration::from_millis(200)).await;

        assert!(!outcome.success);
        assert!(outcome.payload.is_none());
        assert_eq!(outcome.error_message.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let tool = SampleTool::new("downtime", ToolSlot::DowntimeAnalysis, serde_json::json!({}))
            .panicking();
        let outcome = run_with_timeout(Arc::new(tool), args(), Duration::from_millis(200)).await;

        assert!(!outcome.success);
        assert!(outcome.error_message.unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn test_timeout_returns_at_budget() {
        let tool = SampleTool::new("production", ToolSlot::ProductionStatus, serde_json::json!({}))
            .with_delay(Duration::from_secs(5));
        let start = Instant::now();
        let outcome = run_with_timeout(Arc::new(tool), args(), Duration::from_millis(50)).await;

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some("production timed out"));
    }
}
