pub mod documents;
pub mod registration;
pub mod request;
pub mod service;

pub use documents::DocumentCache;
pub use registration::ApiRegistrationServiceImpl;
pub use service::StubServiceImpl;
