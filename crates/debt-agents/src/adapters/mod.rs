//! Bundled port adapters wired up by the CLI.
//!
//! The core stays transport-free; these are the concrete collaborators a
//! local scan uses. Callers embedding the pipeline bring their own.

pub mod fs_repo;
pub mod llm_http;
pub mod memory_store;

pub use fs_repo::LocalRepo;
pub use llm_http::HttpLlm;
pub use memory_store::MemoryStore;
