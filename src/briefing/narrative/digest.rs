//! 数据摘要：把快照中已到达的槽位渲染为紧凑文本，供模型路径使用
//!
//! 每个工具一个块（`## <slot>`），每个数据点一行并跟随其引用标记 `[Source: <table>]`。

use serde_json::Value;

use crate::briefing::narrative::template::markers_of;
use crate::briefing::{AggregateSnapshot, ToolOutcome};

/// 单个数据点的最大字符数
const MAX_POINT_CHARS: usize = 400;

pub fn render_digest(snapshot: &AggregateSnapshot) -> String {
    let blocks: Vec<String> = snapshot
        .outcomes()
        .map(|outcome| render_block(snapshot, outcome))
        .collect();
    blocks.join("\n\n")
}

fn render_block(snapshot: &AggregateSnapshot, outcome: &ToolOutcome) -> String {
    let mut lines = vec![format!("## {}", outcome.slot.name())];
    match outcome.data() {
        Some(payload) => {
            let mut markers = markers_of(snapshot, outcome.slot);
            if markers.is_empty() {
                markers = format!("[Source: {}]", outcome.tool_name);
            }
            for point in data_points(payload) {
                lines.push(format!("- {} {}", point, markers));
            }
        }
        None => lines.push(format!(
            "- unavailable: {}",
            outcome.error_message.as_deref().unwrap_or("no data")
        )),
    }
    lines.join("\n")
}

/// 对象的每个字段一个数据点，数组字段展开为每个元素一个数据点
fn data_points(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .iter()
            .flat_map(|(key, v)| match v {
                Value::Array(items) if items.is_empty() => vec![format!("{}: none", key)],
                Value::Array(items) => items
                    .iter()
                    .map(|item| format!("{}: {}", key, compact(item)))
                    .collect(),
                other => vec![format!("{}: {}", key, compact(other))],
            })
            .collect(),
        Value::Array(items) => items.iter().map(compact).collect(),
        other => vec![compact(other)],
    }
}

fn compact(value: &Value) -> String {
    let s = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if s.chars().count() > MAX_POINT_CHARS {
        format!("{}...", s.chars().take(MAX_POINT_CHARS).collect::<String>())
    } else {
        s
    }
}
