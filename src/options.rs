//! Plugin options parsed from the protoc parameter string.
//!
//! The host passes a single comma-separated string such as
//! `paths=source_relative,operation_name_template={service}.{method}`. Every key
//! is validated up front; anything unrecognized aborts the invocation before a
//! single file is generated.

use crate::error::{Error, Result};
use crate::naming::is_go_identifier;
use std::collections::{BTreeMap, BTreeSet};

/// Default suffix substituted for the `.proto` extension.
pub const DEFAULT_FILE_SUFFIX: &str = "_nexus.pb.go";

/// Default runtime operation-name template.
pub const DEFAULT_OPERATION_NAME_TEMPLATE: &str = "{method}";

/// Where generated files are placed relative to the output directory.
///
/// Defaults to [`PathMode::Import`], matching `protoc-gen-go`, so the output
/// lands in the same directory as the message types it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMode {
    /// Under the Go import path of the file
    /// (`example.com/gen/oms/v1/oms_nexus.pb.go`).
    #[default]
    Import,
    /// Next to the proto file (`oms/v1/oms.proto` -> `oms/v1/oms_nexus.pb.go`).
    SourceRelative,
}

/// Typed plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Declares the generated code in its own Go package, placed in a
    /// sub-directory of the proto file's package
    pub package: Option<String>,
    /// Template for runtime operation names
    pub operation_name_template: OperationNameTemplate,
    /// Suffix replacing `.proto` in output file names
    pub file_suffix: String,
    /// Output placement
    pub paths: PathMode,
    /// Import-path prefix stripped from output names (`module=`)
    pub module: Option<String>,
    /// `M<file>=<import path>` overrides, keyed by proto file name
    pub import_mappings: BTreeMap<String, String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            package: None,
            operation_name_template: OperationNameTemplate::default(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            paths: PathMode::default(),
            module: None,
            import_mappings: BTreeMap::new(),
        }
    }
}

impl GenerationOptions {
    /// Parse the host-supplied parameter string.
    pub fn parse(param: Option<&str>) -> Result<Self> {
        let mut opts = Self::default();
        let Some(param) = param else {
            return Ok(opts);
        };

        let mut seen = BTreeSet::new();
        for part in param.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                return Err(Error::invalid_option(part, "expected key=value"));
            };
            let (key, value) = (key.trim(), value.trim());

            if let Some(file) = key.strip_prefix('M').filter(|f| !f.is_empty()) {
                if value.is_empty() {
                    return Err(Error::invalid_option(key, "import path must not be empty"));
                }
                if opts
                    .import_mappings
                    .insert(file.to_string(), value.to_string())
                    .is_some()
                {
                    return Err(Error::invalid_option(key, "specified more than once"));
                }
                continue;
            }

            if !seen.insert(key.to_string()) {
                return Err(Error::invalid_option(key, "specified more than once"));
            }

            match key {
                "package" => {
                    if !is_go_identifier(value) {
                        return Err(Error::invalid_option(
                            key,
                            format!("{value:?} is not a valid Go package name"),
                        ));
                    }
                    opts.package = Some(value.to_string());
                }
                "operation_name_template" => {
                    opts.operation_name_template = OperationNameTemplate::parse(value)?;
                }
                "file_suffix" => {
                    if value.is_empty() || value.contains('/') {
                        return Err(Error::invalid_option(
                            key,
                            "suffix must be non-empty and must not contain '/'",
                        ));
                    }
                    opts.file_suffix = value.to_string();
                }
                "module" => {
                    let prefix = value.trim_end_matches('/');
                    if prefix.is_empty() {
                        return Err(Error::invalid_option(key, "module prefix must not be empty"));
                    }
                    opts.module = Some(prefix.to_string());
                }
                "paths" => {
                    opts.paths = match value {
                        "source_relative" => PathMode::SourceRelative,
                        "import" => PathMode::Import,
                        other => {
                            return Err(Error::invalid_option(
                                key,
                                format!("expected import or source_relative, got {other:?}"),
                            ))
                        }
                    };
                }
                _ => return Err(Error::UnknownOption(key.to_string())),
            }
        }

        if opts.module.is_some() && opts.paths == PathMode::SourceRelative {
            return Err(Error::invalid_option(
                "module",
                "cannot be combined with paths=source_relative",
            ));
        }

        Ok(opts)
    }
}

/// A placeholder accepted by [`OperationNameTemplate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Method,
    Service,
    FullService,
    Package,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Inputs available to an operation-name template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub method: &'a str,
    pub service: &'a str,
    pub full_service: &'a str,
    pub package: &'a str,
}

/// Pre-parsed operation-name template.
///
/// Recognized placeholders are `{method}`, `{service}`, `{full_service}` and
/// `{package}`. `{{` and `}}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationNameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl Default for OperationNameTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_OPERATION_NAME_TEMPLATE.to_string(),
            segments: vec![Segment::Placeholder(Placeholder::Method)],
        }
    }
}

impl OperationNameTemplate {
    const KEY: &'static str = "operation_name_template";

    pub fn parse(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(Error::invalid_option(Self::KEY, "template must not be empty"));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(Error::invalid_option(
                                    Self::KEY,
                                    format!("unterminated placeholder in {source:?}"),
                                ))
                            }
                        }
                    }
                    let placeholder = match name.as_str() {
                        "method" => Placeholder::Method,
                        "service" => Placeholder::Service,
                        "full_service" => Placeholder::FullService,
                        "package" => Placeholder::Package,
                        other => {
                            return Err(Error::invalid_option(
                                Self::KEY,
                                format!("unknown placeholder {{{other}}}"),
                            ))
                        }
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(placeholder));
                }
                '}' => {
                    return Err(Error::invalid_option(
                        Self::KEY,
                        format!("unmatched '}}' in {source:?}"),
                    ))
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template as written in the parameter string.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: TemplateContext<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(Placeholder::Method) => out.push_str(ctx.method),
                Segment::Placeholder(Placeholder::Service) => out.push_str(ctx.service),
                Segment::Placeholder(Placeholder::FullService) => out.push_str(ctx.full_service),
                Segment::Placeholder(Placeholder::Package) => out.push_str(ctx.package),
            }
        }
        out
    }
}
