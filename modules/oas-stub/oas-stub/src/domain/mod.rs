pub mod charset;
pub mod clock;
pub mod content;
pub mod delay;
pub mod error;
pub mod failure;
pub mod media;
pub mod merge;
pub mod openapi;
pub mod path;
pub mod plugin;
pub mod populate;
pub mod regexp;
pub mod repo;
pub mod services;
pub mod validation;
