mod document;
mod schema;

pub use document::{
    ApiResponse, MediaContent, OpenApiDocument, Operation, Parameter, ParameterLocation,
    RequestBody, SecurityRequirement, SpecError, SpecVersion,
};
pub use schema::{
    AdditionalProperties, Dialect, OpenApi30Dialect, OpenApi31Dialect, Schema, SchemaDialect,
    SchemaType, ValueKind,
};
