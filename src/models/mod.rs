pub mod artifact;
pub mod loaders;
pub mod run_state;
pub mod work_item;

pub use artifact::{ArtifactState, CacheHandle, UploadedArtifact};
pub use loaders::load_work_list;
pub use run_state::{RunPhase, RunState, TokenUsage};
pub use work_item::{default_work_list, WorkItem};
