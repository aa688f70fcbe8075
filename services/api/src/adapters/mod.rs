pub mod analysis_llm;
pub mod auth;
pub mod db;
pub mod functions;
pub mod storage;

pub use analysis_llm::{OpenAiAnalysisAdapter, UnconfiguredAnalysisModel};
pub use auth::PgAuthAdapter;
pub use db::PgRowStore;
pub use functions::{AdminBootstrap, LocalFunctionRunner};
pub use storage::LocalObjectStorage;
