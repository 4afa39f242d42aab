//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BRIEFING__*` 覆盖（双下划线表示嵌套，如 `BRIEFING__BRIEFING__TOTAL_TIMEOUT_SECS=20`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub briefing: BriefingSection,
    #[serde(default)]
    pub llm: LlmSection,
}

/// [briefing] 段：两层超时、工具槽位列表、wins 策略、音频
#[derive(Debug, Clone, Deserialize)]
pub struct BriefingSection {
    /// 单个工具的超时（秒）
    #[serde(default = "default_per_tool_timeout_secs")]
    pub per_tool_timeout_secs: f64,
    /// 整次简报（编排 + 叙述）的总超时（秒），应明显大于单工具超时
    #[serde(default = "default_total_timeout_secs")]
    pub total_timeout_secs: f64,
    /// 按顺序调用的槽位名（productionStatus / safetyEvents / oeeData / downtimeAnalysis / actionList）
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,
    /// 没有资产超前于目标时，是否仍输出一句明确的「暂无亮点」
    #[serde(default = "default_always_emit_wins")]
    pub always_emit_wins: bool,
    /// 是否请求语音合成（由外部协作者完成）
    #[serde(default)]
    pub audio_requested: bool,
}

fn default_per_tool_timeout_secs() -> f64 {
    5.0
}

fn default_total_timeout_secs() -> f64 {
    30.0
}

fn default_tools() -> Vec<String> {
    vec![
        "productionStatus".into(),
        "safetyEvents".into(),
        "oeeData".into(),
        "downtimeAnalysis".into(),
        "actionList".into(),
    ]
}

fn default_always_emit_wins() -> bool {
    true
}

impl Default for BriefingSection {
    fn default() -> Self {
        Self {
            per_tool_timeout_secs: default_per_tool_timeout_secs(),
            total_timeout_secs: default_total_timeout_secs(),
            tools: default_tools(),
            always_emit_wins: default_always_emit_wins(),
            audio_requested: false,
        }
    }
}

/// [llm] 段：补全后端
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 关闭后只走模板路径
    #[serde(default = "default_llm_enabled")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

fn default_llm_enabled() -> bool {
    true
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            enabled: default_llm_enabled(),
            model: default_model(),
            base_url: None,
        }
    }
}

/// 从 config 目录加载配置，环境变量 BRIEFING__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BRIEFING__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{}.toml", name)).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("Config file {} not found, ignoring", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BRIEFING")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
