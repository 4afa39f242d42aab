//! Plant Briefing - 制造工厂晨会简报生成
//!
//! 模块划分：
//! - **briefing**: 编排、叙述、兜底、组装与全局截止
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **llm**: 补全后端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化
//! - **tools**: 数据工具接口、注册表、单工具超时守卫与示例工具

pub mod briefing;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod tools;

pub use briefing::{BriefingResult, BriefingScope, BriefingService};
