//! Go identifiers and runtime names derived from proto services.

use crate::error::{Error, Result};
use crate::model::{OperationDescriptor, ServiceDescriptor};
use crate::options::{GenerationOptions, TemplateContext};
use crate::types::TypeIndex;
use std::collections::BTreeMap;

const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Convert a proto name to an exported Go identifier, following the rules
/// `protoc-gen-go` uses so generated names line up with its message types.
///
/// `foo_bar` -> `FooBar`, `Outer.Inner` -> `Outer_Inner`, `_x` -> `XX`.
pub fn go_camel_case(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let next_is_lower = bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase);
        match c {
            b'.' if next_is_lower => {}
            b'.' => out.push('_'),
            b'_' if i == 0 || bytes[i - 1] == b'.' => out.push('X'),
            b'_' if next_is_lower => {}
            c if c.is_ascii_digit() => out.push(c as char),
            c => {
                out.push(c.to_ascii_uppercase() as char);
                while bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase) {
                    i += 1;
                    out.push(bytes[i] as char);
                }
            }
        }
        i += 1;
    }
    out
}

/// Turn an arbitrary string (such as the last element of an import path) into
/// a usable Go package name.
pub fn go_sanitized(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let starts_with_letter = sanitized.chars().next().is_some_and(char::is_alphabetic);
    if !starts_with_letter || GO_KEYWORDS.contains(&sanitized.as_str()) {
        format!("_{sanitized}")
    } else {
        sanitized
    }
}

pub fn is_go_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !GO_KEYWORDS.contains(&s)
}

/// Package-level identifiers generated for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNames {
    /// Go-cased service name, the stem of every other identifier
    pub go_name: String,
    pub service_name_const: String,
    pub client: String,
    pub client_constructor: String,
    pub handler: String,
    pub register: String,
}

impl ServiceNames {
    pub fn derive(service: &ServiceDescriptor) -> Self {
        let go_name = go_camel_case(&service.name);
        Self {
            service_name_const: format!("{go_name}ServiceName"),
            client: format!("{go_name}NexusClient"),
            client_constructor: format!("New{go_name}NexusClient"),
            handler: format!("{go_name}NexusServiceHandler"),
            register: format!("Register{go_name}NexusServiceHandler"),
            go_name,
        }
    }
}

/// Identifiers and runtime name generated for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationNames {
    /// Handler interface method
    pub handler_method: String,
    /// Blocking client method
    pub execute: String,
    /// Client method returning the operation future
    pub start: String,
    pub operation_name_const: String,
    /// Name the runtime dispatches on
    pub operation_name: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedOperation<'a> {
    pub descriptor: &'a OperationDescriptor,
    pub names: OperationNames,
}

#[derive(Debug, Clone)]
pub struct ResolvedService<'a> {
    pub descriptor: &'a ServiceDescriptor,
    pub names: ServiceNames,
    pub operations: Vec<ResolvedOperation<'a>>,
}

/// Derive every name for `service`.
///
/// Runtime operation names come from the explicit per-operation option when
/// present, else from the configured template. They must be unique within the
/// service, as must the Go method names on the client and handler.
pub fn resolve_service<'a>(
    service: &'a ServiceDescriptor,
    options: &GenerationOptions,
) -> Result<ResolvedService<'a>> {
    let names = ServiceNames::derive(service);

    let mut runtime_names: BTreeMap<String, &str> = BTreeMap::new();
    let mut methods = MethodScope::default();
    let mut operations = Vec::with_capacity(service.operations.len());

    for op in &service.operations {
        let operation_name = match &op.options.name {
            Some(name) => name.clone(),
            None => options.operation_name_template.render(TemplateContext {
                method: &op.method_name,
                service: &service.name,
                full_service: &service.full_name,
                package: &service.package,
            }),
        };
        if operation_name.is_empty() {
            return Err(Error::invalid_option(
                "operation_name_template",
                format!(
                    "{:?} renders an empty operation name for {}.{}",
                    options.operation_name_template.as_str(),
                    service.full_name,
                    op.method_name
                ),
            ));
        }
        if let Some(first) = runtime_names.insert(operation_name.clone(), &op.method_name) {
            return Err(Error::DuplicateOperationName {
                service: service.full_name.clone(),
                name: operation_name,
                first: first.to_string(),
                second: op.method_name.clone(),
            });
        }

        let go_method = go_camel_case(&op.method_name);
        let op_names = OperationNames {
            execute: format!("Execute{go_method}"),
            start: format!("Start{go_method}"),
            operation_name_const: format!("{}{go_method}OperationName", names.go_name),
            handler_method: go_method,
            operation_name,
        };

        let origin = format!("operation {}.{}", service.full_name, op.method_name);
        methods.claim(&names.client, &op_names.execute, &origin)?;
        methods.claim(&names.client, &op_names.start, &origin)?;
        methods.claim(&names.handler, &op_names.handler_method, &origin)?;

        tracing::debug!(
            service = %service.full_name,
            method = %op.method_name,
            operation_name = %op_names.operation_name,
            "Resolved operation names"
        );
        operations.push(ResolvedOperation {
            descriptor: op,
            names: op_names,
        });
    }

    Ok(ResolvedService {
        descriptor: service,
        names,
        operations,
    })
}

/// Method identifiers already used on each generated Go type.
#[derive(Default)]
struct MethodScope {
    by_type: BTreeMap<(String, String), String>,
}

impl MethodScope {
    fn claim(&mut self, owner: &str, method: &str, origin: &str) -> Result<()> {
        let key = (owner.to_string(), method.to_string());
        match self.by_type.get(&key) {
            Some(first) => Err(Error::IdentifierCollision {
                identifier: format!("{owner}.{method}"),
                first: first.clone(),
                second: origin.to_string(),
            }),
            None => {
                self.by_type.insert(key, origin.to_string());
                Ok(())
            }
        }
    }
}

/// Package-level Go identifiers claimed so far, per Go import path.
///
/// Shared by every file of one invocation: two proto files that map to the same
/// Go package end up in one Go namespace.
#[derive(Debug, Clone, Default)]
pub struct IdentifierRegistry {
    packages: BTreeMap<String, BTreeMap<String, String>>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `ident` in the package at `import_path` on behalf of `origin`.
    pub fn reserve(&mut self, import_path: &str, ident: &str, origin: &str) -> Result<()> {
        let scope = self.packages.entry(import_path.to_string()).or_default();
        match scope.get(ident) {
            Some(first) if first != origin => Err(Error::IdentifierCollision {
                identifier: ident.to_string(),
                first: first.clone(),
                second: origin.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                scope.insert(ident.to_string(), origin.to_string());
                Ok(())
            }
        }
    }

    /// Claim the Go names `protoc-gen-go` emits for the messages and enums of
    /// a package.
    pub fn seed_proto_types(&mut self, index: &TypeIndex, import_path: &str) {
        let scope = self.packages.entry(import_path.to_string()).or_default();
        for message in index.types_in_package(import_path) {
            scope
                .entry(message.go_ident.clone())
                .or_insert_with(|| format!("message {}", message.full_name));
        }
        for en in index.enums_in_package(import_path) {
            for ident in &en.go_idents {
                scope
                    .entry(ident.clone())
                    .or_insert_with(|| format!("enum {}", en.full_name));
            }
        }
    }

    /// Claim every package-level identifier of a resolved service.
    pub fn register_service(&mut self, import_path: &str, service: &ResolvedService<'_>) -> Result<()> {
        let origin = format!("service {}", service.descriptor.full_name);
        let names = &service.names;
        for ident in [
            &names.service_name_const,
            &names.client,
            &names.client_constructor,
            &names.handler,
            &names.register,
        ] {
            self.reserve(import_path, ident, &origin)?;
        }

        for op in &service.operations {
            let origin = format!(
                "operation {}.{}",
                service.descriptor.full_name, op.descriptor.method_name
            );
            self.reserve(import_path, &op.names.operation_name_const, &origin)?;
        }
        Ok(())
    }

    pub fn contains(&self, import_path: &str, ident: &str) -> bool {
        self.packages
            .get(import_path)
            .is_some_and(|scope| scope.contains_key(ident))
    }
}
