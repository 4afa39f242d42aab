//! 工具编排器
//!
//! 为每个已注册工具启动一个独立的守卫任务（JoinSet），结果到达即写入调用方持有的快照。
//! 编排器自身不设总超时；外层截止丢弃本 future 时 JoinSet 随之 drop，
//! 所有未完成任务被 abort，其迟到结果不会再写入任何快照。

use tokio::task::JoinSet;

use crate::briefing::{AggregateSnapshot, ScopeArgs};
use crate::tools::{ToolExecutor, ToolRegistry};

/// 工具编排器：持有注册表与单工具守卫
#[derive(Clone)]
pub struct ToolOrchestrator {
    registry: ToolRegistry,
    executor: ToolExecutor,
}

impl ToolOrchestrator {
    pub fn new(registry: ToolRegistry, executor: ToolExecutor) -> Self {
        Self { registry, executor }
    }

    /// 与注册表槽位一致的空快照
    pub fn empty_snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot::new(self.registry.slots())
    }

    /// 并发调用全部工具，全部报告后返回快照
    pub async fn orchestrate(&self, args: &ScopeArgs) -> AggregateSnapshot {
        let mut snapshot = self.empty_snapshot();
        self.orchestrate_into(args, &mut snapshot).await;
        snapshot
    }

    /// 并发调用全部工具，边到达边写入 snapshot；future 被 drop 时已写入的槽位保持不变
    pub async fn orchestrate_into(&self, args: &ScopeArgs, snapshot: &mut AggregateSnapshot) {
        let mut tasks = JoinSet::new();
        for tool in self.registry.tools() {
            let tool = tool.clone();
            let args = args.clone();
            let executor = self.executor;
            tasks.spawn(async move { executor.execute(tool, args).await });
        }
        tracing::info!(
            tools = tasks.len(),
            budget_ms = self.executor.budget().as_millis() as u64,
            "Orchestration started"
        );

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    tracing::debug!(
                        slot = %outcome.slot,
                        success = outcome.success,
                        duration_ms = outcome.duration_ms,
                        "Tool reported"
                    );
                    snapshot.record(outcome);
                }
                // 守卫本身不会 panic；这里只可能是运行时关闭导致的取消，槽位保持缺失
                Err(e) => tracing::error!(error = %e, "Tool task did not complete"),
            }
        }

        let failed = snapshot.outcomes().filter(|o| !o.success).count();
        tracing::info!(
            arrived = snapshot.outcomes().count(),
            failed,
            "Orchestration finished"
        );
    }
}
