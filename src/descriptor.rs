//! Descriptor adapter: turns the host's descriptor tree into [`ServiceDescriptor`]s.
//!
//! Structure comes from the decoded `FileDescriptorProto`s. Custom options
//! (`nexus.temporal.v1.operation` / `nexus.temporal.v1.service`) are extension
//! fields, which `prost-types` drops on decode, so they are read through a
//! reflective [`DescriptorPool`] built from the raw file bytes instead.

use crate::error::{Error, Result};
use crate::model::{OperationDescriptor, OperationOptions, ServiceDescriptor};
use prost_reflect::{DescriptorPool, DynamicMessage, ExtensionDescriptor, Value};
use prost_types::{FileDescriptorProto, MethodDescriptorProto};
use std::collections::{BTreeMap, BTreeSet};

/// MethodOptions extension carrying a per-operation runtime name.
pub const OPERATION_EXTENSION: &str = "nexus.temporal.v1.operation";

/// ServiceOptions extension carrying a runtime service name.
pub const SERVICE_EXTENSION: &str = "nexus.temporal.v1.service";

/// Reflective view of the request, used only to read custom options.
pub struct OptionsPool {
    pool: DescriptorPool,
    operation_ext: Option<ExtensionDescriptor>,
    service_ext: Option<ExtensionDescriptor>,
    skipped: BTreeMap<String, String>,
}

impl OptionsPool {
    /// Index `(file name, serialized FileDescriptorProto)` pairs in dependency
    /// order. Files that fail to index are recorded and skipped.
    pub fn build<'a, I>(files: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut pool = DescriptorPool::new();
        let mut skipped = BTreeMap::new();
        for (name, bytes) in files {
            if let Err(err) = pool.decode_file_descriptor_proto(bytes) {
                tracing::debug!(file = %name, error = %err, "Could not index file for custom options");
                skipped.insert(name.to_string(), err.to_string());
            }
        }

        Self {
            operation_ext: pool.get_extension_by_name(OPERATION_EXTENSION),
            service_ext: pool.get_extension_by_name(SERVICE_EXTENSION),
            pool,
            skipped,
        }
    }

    /// A pool without any files; no overrides are ever found.
    pub fn empty() -> Self {
        Self::build(std::iter::empty())
    }

    /// Why `file` could not be indexed, if it could not.
    pub fn skipped_reason(&self, file: &str) -> Option<&str> {
        self.skipped.get(file).map(String::as_str)
    }

    fn service_override(&self, service: &str) -> Option<String> {
        let ext = self.service_ext.as_ref()?;
        let svc = self.pool.get_service_by_name(service)?;
        name_field(&svc.options(), ext)
    }

    fn operation_override(&self, service: &str, method: &str) -> Option<String> {
        let ext = self.operation_ext.as_ref()?;
        let svc = self.pool.get_service_by_name(service)?;
        let method = svc.methods().find(|m| m.name() == method)?;
        name_field(&method.options(), ext)
    }
}

/// Read the `name` field of an options message stored in extension `ext`.
fn name_field(opts: &DynamicMessage, ext: &ExtensionDescriptor) -> Option<String> {
    if !opts.has_extension(ext) {
        return None;
    }

    let val = opts.get_extension(ext);
    let Value::Message(msg) = val.as_ref() else {
        return None;
    };
    msg.get_field_by_name("name")
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|name| !name.is_empty())
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

fn required<'a>(value: Option<&'a str>, what: impl FnOnce() -> String) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MalformedDescriptor(what()))
}

fn streaming_kind(method: &MethodDescriptorProto) -> Option<&'static str> {
    match (method.client_streaming(), method.server_streaming()) {
        (false, false) => None,
        (true, false) => Some("client-streaming"),
        (false, true) => Some("server-streaming"),
        (true, true) => Some("bidirectional-streaming"),
    }
}

/// Collect the services declared directly in `file`, in declaration order.
pub fn collect_services(
    file: &FileDescriptorProto,
    options: &OptionsPool,
) -> Result<Vec<ServiceDescriptor>> {
    let file_name = file.name();
    let package = file.package();

    if !file.service.is_empty() {
        if let Some(reason) = options.skipped_reason(file_name) {
            tracing::warn!(
                file = %file_name,
                reason = %reason,
                "Custom Nexus options are unavailable for this file; using derived names"
            );
        }
    }

    let mut services = Vec::with_capacity(file.service.len());
    for (idx, svc) in file.service.iter().enumerate() {
        let name = required(svc.name.as_deref(), || {
            format!("service #{idx} in {file_name} has no name")
        })?;
        let full_name = qualify(package, name);

        let mut seen = BTreeSet::new();
        let mut operations = Vec::with_capacity(svc.method.len());
        for (midx, method) in svc.method.iter().enumerate() {
            let method_name = required(method.name.as_deref(), || {
                format!("method #{midx} of service {full_name} has no name")
            })?;
            let qualified = format!("{full_name}.{method_name}");

            if !seen.insert(method_name) {
                return Err(Error::MalformedDescriptor(format!(
                    "method {qualified} is declared more than once"
                )));
            }
            let input_type = required(method.input_type.as_deref(), || {
                format!("method {qualified} has no input type")
            })?;
            let output_type = required(method.output_type.as_deref(), || {
                format!("method {qualified} has no output type")
            })?;
            if let Some(kind) = streaming_kind(method) {
                return Err(Error::UnsupportedMethodKind {
                    method: qualified,
                    kind,
                });
            }

            operations.push(OperationDescriptor {
                method_name: method_name.to_string(),
                input_type: input_type.to_string(),
                output_type: output_type.to_string(),
                options: OperationOptions {
                    name: options.operation_override(&full_name, method_name),
                },
            });
        }

        if operations.is_empty() {
            tracing::warn!(
                service = %full_name,
                "Service declares no methods; generating an empty client and handler"
            );
        }

        services.push(ServiceDescriptor {
            name_override: options.service_override(&full_name),
            full_name,
            name: name.to_string(),
            package: package.to_string(),
            file: file_name.to_string(),
            operations,
        });
    }

    tracing::debug!(file = %file_name, services = services.len(), "Collected services");
    Ok(services)
}
