pub mod executor;
pub mod registry;
pub mod sample;

pub use executor::{run_with_timeout, ToolExecutor};
pub use registry::{BriefingTool, ToolOutput, ToolRegistry};
pub use sample::{sample_registry, SampleTool};
