//! Repositories implementing the graph store, version ledger, and
//! generation lifecycle contracts.

pub mod connection_repo;
pub mod generation_repo;
pub mod project_repo;
pub mod snippet_repo;
pub mod version_repo;

pub use connection_repo::ConnectionRepo;
pub use generation_repo::GenerationRepo;
pub use project_repo::ProjectRepo;
pub use snippet_repo::SnippetRepo;
pub use version_repo::VersionRepo;
