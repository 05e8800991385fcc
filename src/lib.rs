//! # nexus-temporal-codegen
//!
//! A protoc plugin that turns gRPC-style service definitions into Temporal
//! Nexus glue code for Go.
//!
//! For every service declared in a proto file it emits:
//!
//! - **Name constants**: the runtime service name and one operation name per method
//! - **Client**: `<Service>NexusClient` with `Start<Method>` / `Execute<Method>`
//!   for calling operations from workflow code
//! - **Handler interface**: `<Service>NexusServiceHandler`, one method per operation
//! - **Registration**: `Register<Service>NexusServiceHandler`, binding a handler
//!   to a worker's Nexus service registry
//!
//! ## Pipeline
//!
//! ```text
//! CodeGeneratorRequest
//!   └─ descriptor::collect_services   services and operations per file
//!      └─ naming::resolve_service     Go identifiers and runtime names
//!         └─ types::TypeMapper        message types and imports
//!            └─ codegen::render_file  Go source
//! CodeGeneratorResponse
//! ```
//!
//! ## Options
//!
//! The protoc parameter string is a comma-separated `key=value` list, for example
//! `--go_nexus-temporal_opt=paths=source_relative,operation_name_template={service}.{method}`.
//! See [`GenerationOptions`] for the recognized keys.
//!
//! Per-method and per-service names can also be pinned in the proto source with
//! the `nexus.temporal.v1.operation` and `nexus.temporal.v1.service` options
//! declared in `proto/nexus/temporal/v1/options.proto`.

pub mod codegen;
pub mod descriptor;
pub mod error;
pub mod logging;
pub mod model;
pub mod naming;
pub mod options;
pub mod plugin;
pub mod types;

pub use error::{Error, Result};
pub use logging::LoggingConfig;
pub use model::{OperationDescriptor, OperationOptions, ServiceDescriptor};
pub use options::{GenerationOptions, OperationNameTemplate, PathMode};
pub use plugin::{generate, generate_from_bytes, read_request, write_response, RawCodeGeneratorRequest};
