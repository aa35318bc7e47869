//! Build pipeline: request lifecycle, worker protocol, compiler adapter.
//!
//! ```text
//! App::build()
//!   validate -> BuildRequest -> BuildWorker -> BuildReply
//!                                 |  (process or task)
//!                                 Bundler (external command)
//!   -> StatsReport -> ChunkIndex + RenderResolver -> ListeningServer
//! ```

mod bundler;
mod error;
mod orchestrator;
mod request;
mod stats;
mod worker;

pub use bundler::{Bundler, CommandBundler};
pub use error::BuildError;
pub use orchestrator::{App, EngineLoader};
pub use request::BuildRequest;
pub use stats::{ChunkStat, CompilationStats, ModuleId, ModuleStat, StatsReport};
pub use worker::{BuildReply, BuildWorker, ProcessWorker, TaskWorker, worker_main};
