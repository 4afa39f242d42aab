//! 模型回复解析
//!
//! 从回复中提取 JSON（```json 代码块或首个 `{` 到最后一个 `}`），要求恰好包含
//! headline / wins / concerns / actions 四个块（不多不少），且每块 title、content 非空。

use serde_json::Value;

use crate::core::NarrativeParseError;

/// 模型给出的单个块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBlock {
    pub title: String,
    pub content: String,
}

/// 解析成功的四个块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSections {
    pub headline: ModelBlock,
    pub wins: ModelBlock,
    pub concerns: ModelBlock,
    pub actions: ModelBlock,
}

pub const BLOCK_NAMES: [&str; 4] = ["headline", "wins", "concerns", "actions"];

/// 解析模型回复；任何不符合结构的回复都返回 Err，由调用方回落到模板路径
pub fn parse_model_reply(reply: &str) -> Result<ModelSections, NarrativeParseError> {
    let json_str = extract_json(reply).ok_or(NarrativeParseError::NoJson)?;
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| NarrativeParseError::Malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| NarrativeParseError::Malformed("top level is not an object".to_string()))?;
    if let Some(extra) = object.keys().find(|k| !BLOCK_NAMES.contains(&k.as_str())) {
        return Err(NarrativeParseError::UnexpectedBlock(extra.clone()));
    }

    let block = |name: &'static str| -> Result<ModelBlock, NarrativeParseError> {
        let raw = object
            .get(name)
            .and_then(Value::as_object)
            .ok_or(NarrativeParseError::MissingBlock(name))?;
        let title = text_field(raw.get("title"));
        let content = text_field(raw.get("content"));
        if title.is_empty() || content.is_empty() {
            return Err(NarrativeParseError::EmptyBlock(name));
        }
        Ok(ModelBlock { title, content })
    };

    Ok(ModelSections {
        headline: block(BLOCK_NAMES[0])?,
        wins: block(BLOCK_NAMES[1])?,
        concerns: block(BLOCK_NAMES[2])?,
        actions: block(BLOCK_NAMES[3])?,
    })
}

fn extract_json(reply: &str) -> Option<&str> {
    let trimmed = reply.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// 字符串原样返回；字符串数组按行拼接（部分模型会把要点列成数组）
fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
