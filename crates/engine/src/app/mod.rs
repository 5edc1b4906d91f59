mod input;
mod loop_runner;
mod metrics;
mod scene;

pub use input::{ActionStates, InputAction, InputCollector, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig, LoopSummary, StopReason};
pub use scene::{InputSource, Scene, SceneCommand};
