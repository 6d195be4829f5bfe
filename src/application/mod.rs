//! Application layer - use cases and orchestration.
//!
//! This layer contains the pipeline logic: change detection, media path
//! resolution, message rendering, dialogue reconstruction, and the run
//! orchestrator tying the phases together.

pub mod change_detector;
pub mod media_resolver;
pub mod orchestrator;
pub mod reconstructor;
pub mod renderer;

pub use change_detector::{classify, Classification};
pub use media_resolver::{resolve_media_path, MediaCategory};
pub use orchestrator::{ExportOrchestrator, RunOptions, RunPhase};
pub use reconstructor::DialogueReconstructor;
pub use renderer::render_content;
