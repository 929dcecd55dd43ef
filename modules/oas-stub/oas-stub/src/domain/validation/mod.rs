//! Request and schema validation.

mod format;
mod request;
mod result;
mod schema;

pub use format::{FormatValidator, FormatValidators, PatternCache};
pub use request::{
    BodyValidator, ParameterValidator, PathVariableValidator, RequestValidationInput,
    RequestValidator, RequestValidators, SecurityValidator,
};
pub use result::{PROBLEM_JSON, ValidationDetail, ValidationResult, ValidationResultType};
pub use schema::{ROOT_PROPERTY, SchemaValidator};
