//! Plant Briefing 命令行入口
//!
//! 初始化日志、加载配置、用示例工具生成一次简报，并把 BriefingResult 以 JSON 输出到 stdout。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use plant_briefing::{
    briefing::{BriefingScope, BriefingService},
    config::{load_config, AppConfig},
    observability,
    tools::sample_registry,
};

#[derive(Parser, Debug)]
#[command(name = "plant-briefing", version, about = "Generate a morning briefing for a manufacturing plant")]
struct Args {
    /// 请求简报的用户
    #[arg(long, env = "BRIEFING_USER", default_value = "cli")]
    user: String,

    /// 区域 ID；给出时生成区域简报，否则生成全厂简报
    #[arg(long)]
    area: Option<String>,

    /// 额外的 TOML 配置文件，覆盖 config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let args = Args::parse();

    let cfg = load_config(args.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config ({}), using defaults", e);
        AppConfig::default()
    });

    let registry = sample_registry().context("Failed to register sample tools")?;
    let service =
        BriefingService::from_config(&cfg, registry).context("Invalid briefing configuration")?;

    let scope = if args.area.is_some() {
        BriefingScope::Area
    } else {
        BriefingScope::Plant
    };
    let result = service
        .generate_briefing(&args.user, scope, args.area.as_deref())
        .await;

    let json = serde_json::to_string_pretty(&result).context("Failed to serialise briefing")?;
    println!("{}", json);

    Ok(())
}
