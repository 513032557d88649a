//! Release workflow entry points shared by the binary and tests

pub mod orchestration;

pub use orchestration::{
    run_release, ReleaseOrchestrator, ReleaseRequest, ReleaseResult, ReleaseState, ReleaseStatus,
};
