pub mod definitions_repo;
pub mod metrics;
pub mod records;
pub mod session;

pub use definitions_repo::InMemoryApiDefinitionsRepository;
pub use metrics::InMemoryApiObserver;
pub use records::InMemoryApiRecorder;
pub use session::InMemorySessionStorage;
