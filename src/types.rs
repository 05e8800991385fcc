//! Message type resolution and Go import bookkeeping.
//!
//! Every message in the request (nested ones included) is indexed once by its
//! fully-qualified name. Operations borrow [`TypeReference`]s out of that arena,
//! so resolving a type is a map lookup no matter how the proto files import
//! each other.

use crate::error::{Error, Result};
use crate::naming::{go_camel_case, go_sanitized};
use crate::options::GenerationOptions;
use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const NEXUS_IMPORT_PATH: &str = "github.com/nexus-rpc/sdk-go/nexus";
pub const WORKER_IMPORT_PATH: &str = "go.temporal.io/sdk/worker";
pub const WORKFLOW_IMPORT_PATH: &str = "go.temporal.io/sdk/workflow";

/// Local identifiers used inside generated function bodies. Import aliases must
/// not shadow them.
const RESERVED_LOCALS: &[&str] = &[
    "c", "ctx", "endpoint", "err", "handler", "input", "name", "options", "output", "registry",
    "service",
];

/// The Go package a proto file's messages are generated into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoPackage {
    pub import_path: String,
    pub name: String,
}

impl GoPackage {
    /// Derive the Go package of a proto file.
    ///
    /// Precedence: `M<file>=` mapping, the `go_package` file option, then the
    /// directory of the proto file. A non-empty `;name` suffix on either of the
    /// first two sets the package name explicitly.
    pub fn for_file(file: &FileDescriptorProto, options: &GenerationOptions) -> Self {
        let file_name = file.name();
        let declared = options
            .import_mappings
            .get(file_name)
            .map(String::as_str)
            .or_else(|| {
                file.options
                    .as_ref()
                    .and_then(|o| o.go_package.as_deref())
                    .filter(|p| !p.is_empty())
            });

        let (import_path, explicit_name) = match declared {
            Some(spec) => match spec.split_once(';') {
                Some((path, name)) => (
                    path.to_string(),
                    Some(name.trim()).filter(|n| !n.is_empty()).map(go_sanitized),
                ),
                None => (spec.to_string(), None),
            },
            None => {
                let dir = file_name.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
                let path = if dir.is_empty() {
                    file_name.trim_end_matches(".proto").to_string()
                } else {
                    dir.to_string()
                };
                (path, None)
            }
        };

        let name = explicit_name.unwrap_or_else(|| {
            let base = import_path.rsplit('/').next().unwrap_or(&import_path);
            go_sanitized(base)
        });

        Self { import_path, name }
    }

    /// The Go package a generated file lands in when the `package=` option
    /// names `package_override`.
    ///
    /// A differing name cannot share the directory of the `protoc-gen-go`
    /// output, so it becomes a sub-package `<import path>/<name>`.
    pub fn output_package(&self, package_override: Option<&str>) -> GoPackage {
        match package_override {
            Some(name) if name != self.name => GoPackage {
                import_path: format!("{}/{name}", self.import_path),
                name: name.to_string(),
            },
            _ => self.clone(),
        }
    }
}

/// A resolved message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    /// Fully-qualified name without the leading dot
    pub full_name: String,
    /// Proto package of the declaring file
    pub package: String,
    /// Declaring proto file
    pub file: String,
    pub go_package: GoPackage,
    /// Go type name, e.g. `Order_Item` for the nested message `Order.Item`
    pub go_ident: String,
}

/// An enum and the package-level Go identifiers `protoc-gen-go` declares for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumReference {
    pub full_name: String,
    pub go_package: GoPackage,
    /// Enum type, `_name`/`_value` maps and one constant per value
    pub go_idents: Vec<String>,
}

/// Arena of every message type and file in a plugin request.
#[derive(Debug, Default)]
pub struct TypeIndex {
    types: BTreeMap<String, TypeReference>,
    enums: BTreeMap<String, EnumReference>,
    files: BTreeMap<String, GoPackage>,
}

impl TypeIndex {
    pub fn build<'a, I>(files: I, options: &GenerationOptions) -> Self
    where
        I: IntoIterator<Item = &'a FileDescriptorProto>,
    {
        let mut index = Self::default();
        for file in files {
            let go_package = GoPackage::for_file(file, options);
            let package = file.package().to_string();
            for message in &file.message_type {
                index.insert_message(file, &package, &go_package, None, message);
            }
            for en in &file.enum_type {
                index.insert_enum(&package, &go_package, None, en);
            }
            index
                .files
                .entry(file.name().to_string())
                .or_insert(go_package);
        }
        index
    }

    fn insert_message(
        &mut self,
        file: &FileDescriptorProto,
        package: &str,
        go_package: &GoPackage,
        parent: Option<&str>,
        message: &DescriptorProto,
    ) {
        if message
            .options
            .as_ref()
            .and_then(|o| o.map_entry)
            .unwrap_or(false)
        {
            return;
        }

        let relative = match parent {
            Some(parent) => format!("{parent}.{}", message.name()),
            None => message.name().to_string(),
        };
        let full_name = if package.is_empty() {
            relative.clone()
        } else {
            format!("{package}.{relative}")
        };

        self.types
            .entry(full_name.clone())
            .or_insert_with(|| TypeReference {
                full_name,
                package: package.to_string(),
                file: file.name().to_string(),
                go_package: go_package.clone(),
                go_ident: go_camel_case(&relative),
            });

        for nested in &message.nested_type {
            self.insert_message(file, package, go_package, Some(&relative), nested);
        }
        for en in &message.enum_type {
            self.insert_enum(package, go_package, Some(&relative), en);
        }
    }

    fn insert_enum(
        &mut self,
        package: &str,
        go_package: &GoPackage,
        parent: Option<&str>,
        en: &EnumDescriptorProto,
    ) {
        let relative = match parent {
            Some(parent) => format!("{parent}.{}", en.name()),
            None => en.name().to_string(),
        };
        let full_name = if package.is_empty() {
            relative.clone()
        } else {
            format!("{package}.{relative}")
        };

        // Values of a nested enum are prefixed with the parent message, not the enum.
        let go_ident = go_camel_case(&relative);
        let value_prefix = parent.map(go_camel_case).unwrap_or_else(|| go_ident.clone());
        let mut go_idents = vec![
            format!("{go_ident}_name"),
            format!("{go_ident}_value"),
        ];
        go_idents.extend(
            en.value
                .iter()
                .map(|v| format!("{value_prefix}_{}", v.name())),
        );
        go_idents.insert(0, go_ident);

        self.enums
            .entry(full_name.clone())
            .or_insert_with(|| EnumReference {
                full_name,
                go_package: go_package.clone(),
                go_idents,
            });
    }

    /// Look up a message by fully-qualified name, with or without the leading dot.
    pub fn resolve(&self, proto_name: &str) -> Option<&TypeReference> {
        self.types.get(proto_name.strip_prefix('.').unwrap_or(proto_name))
    }

    pub fn go_package(&self, file: &str) -> Option<&GoPackage> {
        self.files.get(file)
    }

    /// Message types generated into the Go package at `import_path`.
    pub fn types_in_package<'a>(
        &'a self,
        import_path: &'a str,
    ) -> impl Iterator<Item = &'a TypeReference> + 'a {
        self.types
            .values()
            .filter(move |t| t.go_package.import_path == import_path)
    }

    /// Enums generated into the Go package at `import_path`.
    pub fn enums_in_package<'a>(
        &'a self,
        import_path: &'a str,
    ) -> impl Iterator<Item = &'a EnumReference> + 'a {
        self.enums
            .values()
            .filter(move |e| e.go_package.import_path == import_path)
    }

    /// Number of indexed message types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Import block of one generated file, keyed by import path.
#[derive(Debug, Clone)]
pub struct ImportSet {
    by_path: BTreeMap<String, String>,
    taken: BTreeSet<String>,
}

impl ImportSet {
    /// An import set already holding the Temporal and Nexus SDK packages.
    pub fn with_framework() -> Self {
        let mut set = Self {
            by_path: BTreeMap::new(),
            taken: RESERVED_LOCALS.iter().map(|s| s.to_string()).collect(),
        };
        set.add(NEXUS_IMPORT_PATH, "nexus");
        set.add(WORKER_IMPORT_PATH, "worker");
        set.add(WORKFLOW_IMPORT_PATH, "workflow");
        set
    }

    /// Register an import and return its alias. Registering a path twice
    /// returns the alias chosen the first time.
    pub fn add(&mut self, import_path: &str, package_name: &str) -> String {
        if let Some(alias) = self.by_path.get(import_path) {
            return alias.clone();
        }

        let mut alias = package_name.to_string();
        let mut n = 1;
        while self.taken.contains(&alias) {
            alias = format!("{package_name}{n}");
            n += 1;
        }

        self.taken.insert(alias.clone());
        self.by_path.insert(import_path.to_string(), alias.clone());
        alias
    }

    pub fn alias(&self, import_path: &str) -> Option<&str> {
        self.by_path.get(import_path).map(String::as_str)
    }

    /// `(import path, alias)` pairs sorted by import path.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_path.iter().map(|(p, a)| (p.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

/// A Go type expression such as `CreateOrderInput` or `commonv1.Money`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoTypeExpr {
    pub qualifier: Option<String>,
    pub ident: String,
}

impl fmt::Display for GoTypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.ident),
            None => f.write_str(&self.ident),
        }
    }
}

/// A message type mapped into the file being generated.
#[derive(Debug, Clone)]
pub struct MappedType<'a> {
    pub reference: &'a TypeReference,
    pub expr: GoTypeExpr,
}

/// Maps message types to Go expressions for one output file, collecting the
/// imports they need along the way.
pub struct TypeMapper<'a> {
    index: &'a TypeIndex,
    local: &'a GoPackage,
    imports: ImportSet,
}

impl<'a> TypeMapper<'a> {
    pub fn new(index: &'a TypeIndex, local: &'a GoPackage) -> Self {
        Self {
            index,
            local,
            imports: ImportSet::with_framework(),
        }
    }

    /// Resolve `proto_name`; `referrer` names the method for error reporting.
    pub fn map(&mut self, proto_name: &str, referrer: &str) -> Result<MappedType<'a>> {
        let reference = self
            .index
            .resolve(proto_name)
            .ok_or_else(|| Error::UnresolvableType {
                type_name: proto_name.to_string(),
                referrer: referrer.to_string(),
            })?;

        let qualifier = if reference.go_package.import_path == self.local.import_path {
            None
        } else {
            let alias = self.imports.add(
                &reference.go_package.import_path,
                &reference.go_package.name,
            );
            tracing::debug!(
                type_name = %reference.full_name,
                import_path = %reference.go_package.import_path,
                alias = %alias,
                "Mapped cross-package type"
            );
            Some(alias)
        };

        Ok(MappedType {
            reference,
            expr: GoTypeExpr {
                qualifier,
                ident: reference.go_ident.clone(),
            },
        })
    }

    pub fn into_imports(self) -> ImportSet {
        self.imports
    }
}
