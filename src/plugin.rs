//! protoc plugin driver.
//!
//! protoc writes a `CodeGeneratorRequest` to stdin and expects a
//! `CodeGeneratorResponse` on stdout. The request's `proto_file` entries are
//! kept as raw bytes so that custom options (extensions) survive until the
//! reflective [`OptionsPool`] reads them.

use crate::codegen::{render_file, FileContext, GeneratedOperation, GeneratedService};
use crate::descriptor::{collect_services, OptionsPool};
use crate::error::{Error, Result};
use crate::naming::{resolve_service, IdentifierRegistry};
use crate::options::{GenerationOptions, PathMode};
use crate::types::{GoPackage, TypeIndex, TypeMapper};
use anyhow::Context as _;
use prost::Message;
use prost_types::compiler::{code_generator_response, CodeGeneratorResponse, Version};
use prost_types::FileDescriptorProto;
use std::io::{Read, Write};

/// Version stamped into generated file headers.
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `CodeGeneratorRequest` with `proto_file` left undecoded.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCodeGeneratorRequest {
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: ::prost::alloc::vec::Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub compiler_version: Option<Version>,
    #[prost(bytes, repeated, tag = "15")]
    pub proto_file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

/// Read and decode one request from `reader`.
pub fn read_request(mut reader: impl Read) -> anyhow::Result<RawCodeGeneratorRequest> {
    let mut input = Vec::new();
    reader
        .read_to_end(&mut input)
        .context("failed to read CodeGeneratorRequest from stdin")?;
    RawCodeGeneratorRequest::decode(input.as_slice())
        .context("failed to decode CodeGeneratorRequest")
}

/// Encode `response` and write it to `writer`.
pub fn write_response(mut writer: impl Write, response: &CodeGeneratorResponse) -> anyhow::Result<()> {
    let output = response.encode_to_vec();
    writer
        .write_all(&output)
        .context("failed to write CodeGeneratorResponse to stdout")?;
    writer.flush().context("failed to flush stdout")?;
    Ok(())
}

/// Decode a serialized request and generate the response for it.
pub fn generate_from_bytes(bytes: &[u8]) -> Result<CodeGeneratorResponse> {
    let request = RawCodeGeneratorRequest::decode(bytes)?;
    generate(&request)
}

/// Run the pipeline for every file in `file_to_generate`.
///
/// Per-file failures end up in the response's `error` field, one
/// `<file>: <message>` line each, while the other files are still returned.
/// Only an undecodable descriptor is returned as `Err`.
pub fn generate(request: &RawCodeGeneratorRequest) -> Result<CodeGeneratorResponse> {
    let options = match GenerationOptions::parse(request.parameter.as_deref()) {
        Ok(options) => options,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "Invalid plugin parameter");
            return Ok(response(Vec::new(), Some(err.to_string())));
        }
    };

    let files = request
        .proto_file
        .iter()
        .map(|bytes| FileDescriptorProto::decode(bytes.as_slice()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let index = TypeIndex::build(&files, &options);
    let pool = OptionsPool::build(
        files
            .iter()
            .zip(&request.proto_file)
            .map(|(file, bytes)| (file.name(), bytes.as_slice())),
    );
    let compiler_version = request.compiler_version.as_ref().map(format_version);

    tracing::debug!(
        files = files.len(),
        messages = index.len(),
        targets = request.file_to_generate.len(),
        "Decoded CodeGeneratorRequest"
    );

    let mut registry = IdentifierRegistry::new();
    let mut generated = Vec::new();
    let mut failures = Vec::new();

    for name in &request.file_to_generate {
        let result = match files.iter().find(|f| f.name() == name) {
            Some(file) => {
                let mut scratch = registry.clone();
                let ctx = GenerateContext {
                    index: &index,
                    pool: &pool,
                    options: &options,
                    compiler_version: compiler_version.as_deref(),
                };
                generate_file(file, &ctx, &mut scratch).map(|out| (out, scratch))
            }
            None => Err(Error::MalformedDescriptor(format!(
                "{name} is listed for generation but missing from proto_file"
            ))),
        };

        match result {
            Ok((out, scratch)) => {
                registry = scratch;
                if let Some(out) = out {
                    tracing::debug!(file = %name, output = out.name(), "Generated file");
                    generated.push(out);
                }
            }
            Err(err) => {
                tracing::error!(file = %name, code = err.code(), error = %err, "Generation failed");
                failures.push(format!("{name}: {err}"));
            }
        }
    }

    let error = (!failures.is_empty()).then(|| failures.join("\n"));
    Ok(response(generated, error))
}

struct GenerateContext<'a> {
    index: &'a TypeIndex,
    pool: &'a OptionsPool,
    options: &'a GenerationOptions,
    compiler_version: Option<&'a str>,
}

/// Generate the Go file for one proto file, or `None` if it declares no services.
fn generate_file(
    file: &FileDescriptorProto,
    ctx: &GenerateContext<'_>,
    registry: &mut IdentifierRegistry,
) -> Result<Option<code_generator_response::File>> {
    let services = collect_services(file, ctx.pool)?;
    if services.is_empty() {
        tracing::debug!(file = %file.name(), "No services, skipping");
        return Ok(None);
    }

    let source_package = ctx
        .index
        .go_package(file.name())
        .cloned()
        .unwrap_or_else(|| GoPackage::for_file(file, ctx.options));
    let go_package = source_package.output_package(ctx.options.package.as_deref());
    let name = output_file_name(file.name(), &source_package, &go_package, ctx.options)?;

    let resolved = services
        .iter()
        .map(|service| resolve_service(service, ctx.options))
        .collect::<Result<Vec<_>>>()?;

    registry.seed_proto_types(ctx.index, &go_package.import_path);
    for service in &resolved {
        registry.register_service(&go_package.import_path, service)?;
    }

    let mut mapper = TypeMapper::new(ctx.index, &go_package);
    let mut rendered = Vec::with_capacity(resolved.len());
    for service in resolved {
        let mut operations = Vec::with_capacity(service.operations.len());
        for op in service.operations {
            let descriptor = op.descriptor;
            let referrer = format!("{}.{}", service.descriptor.full_name, descriptor.method_name);
            operations.push(GeneratedOperation {
                method_name: &descriptor.method_name,
                input: mapper.map(&descriptor.input_type, &referrer)?,
                output: mapper.map(&descriptor.output_type, &referrer)?,
                names: op.names,
            });
        }
        tracing::debug!(
            service = %service.descriptor.full_name,
            operations = operations.len(),
            "Resolved service"
        );
        rendered.push(GeneratedService {
            descriptor: service.descriptor,
            names: service.names,
            operations,
        });
    }

    let imports = mapper.into_imports();
    let file_ctx = FileContext {
        source: file.name(),
        package_name: &go_package.name,
        plugin_version: PLUGIN_VERSION,
        compiler_version: ctx.compiler_version,
    };
    let content = render_file(&file_ctx, &imports, &rendered);

    Ok(Some(code_generator_response::File {
        name: Some(name),
        insertion_point: None,
        content: Some(content),
        generated_code_info: None,
    }))
}

/// Name of the generated file for `proto_name`.
///
/// `source` is the Go package of the proto file and `output` the package the
/// generated code is declared in. They differ only under `package=`, which
/// moves the output into a sub-directory named after the override.
pub fn output_file_name(
    proto_name: &str,
    source: &GoPackage,
    output: &GoPackage,
    options: &GenerationOptions,
) -> Result<String> {
    let stem = proto_name.strip_suffix(".proto").unwrap_or(proto_name);
    let (dir, base) = match stem.rsplit_once('/') {
        Some((dir, base)) => (Some(dir), base),
        None => (None, stem),
    };
    let suffix = &options.file_suffix;

    let name = match options.paths {
        PathMode::SourceRelative if source.import_path == output.import_path => format!("{stem}{suffix}"),
        PathMode::SourceRelative => match dir {
            Some(dir) => format!("{dir}/{}/{base}{suffix}", output.name),
            None => format!("{}/{base}{suffix}", output.name),
        },
        PathMode::Import => format!("{}/{base}{suffix}", output.import_path),
    };

    match &options.module {
        None => Ok(name),
        Some(module) => name
            .strip_prefix(module.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
            .ok_or_else(|| {
                Error::invalid_option(
                    "module",
                    format!("import path {} is outside module {module}", output.import_path),
                )
            }),
    }
}

fn format_version(version: &Version) -> String {
    let mut out = format!(
        "v{}.{}.{}",
        version.major(),
        version.minor(),
        version.patch()
    );
    if !version.suffix().is_empty() {
        out.push('-');
        out.push_str(version.suffix());
    }
    out
}

fn response(file: Vec<code_generator_response::File>, error: Option<String>) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        error,
        supported_features: Some(code_generator_response::Feature::Proto3Optional as u64),
        file,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::{DescriptorProto, FileOptions, MethodDescriptorProto, ServiceDescriptorProto};

    fn message(name: &str) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn orders_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("oms/v1/oms.proto".to_string()),
            package: Some("oms.v1".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![message("CreateOrderInput"), message("CreateOrderOutput")],
            service: vec![ServiceDescriptorProto {
                name: Some("Orders".to_string()),
                method: vec![MethodDescriptorProto {
                    name: Some("CreateOrder".to_string()),
                    input_type: Some(".oms.v1.CreateOrderInput".to_string()),
                    output_type: Some(".oms.v1.CreateOrderOutput".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            options: Some(FileOptions {
                go_package: Some("example.com/gen/oms/v1;oms".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn request(files: &[FileDescriptorProto], targets: &[&str], parameter: Option<&str>) -> RawCodeGeneratorRequest {
        RawCodeGeneratorRequest {
            file_to_generate: targets.iter().map(|t| t.to_string()).collect(),
            parameter: parameter.map(str::to_string),
            compiler_version: None,
            proto_file: files.iter().map(|f| f.encode_to_vec()).collect(),
        }
    }

    #[test]
    fn test_generate_single_file() {
        let response = generate(&request(&[orders_file()], &["oms/v1/oms.proto"], None)).unwrap();
        assert_eq!(response.error, None);
        assert_eq!(
            response.supported_features,
            Some(code_generator_response::Feature::Proto3Optional as u64)
        );
        assert_eq!(response.file.len(), 1);
        assert_eq!(response.file[0].name(), "example.com/gen/oms/v1/oms_nexus.pb.go");
        assert!(response.file[0].content().contains("package oms\n"));
    }

    #[test]
    fn test_invalid_parameter_becomes_response_error() {
        let response =
            generate(&request(&[orders_file()], &["oms/v1/oms.proto"], Some("colour=blue"))).unwrap();
        assert!(response.file.is_empty());
        assert_eq!(response.error.as_deref(), Some("unknown option \"colour\""));
    }

    #[test]
    fn test_missing_target_is_reported() {
        let response = generate(&request(&[orders_file()], &["missing.proto"], None)).unwrap();
        assert!(response.file.is_empty());
        assert!(response.error.unwrap().starts_with("missing.proto: malformed descriptor"));
    }

    #[test]
    fn test_undecodable_descriptor_is_fatal() {
        let req = RawCodeGeneratorRequest {
            file_to_generate: vec!["a.proto".to_string()],
            parameter: None,
            compiler_version: None,
            proto_file: vec![vec![0xff, 0xff, 0xff]],
        };
        let err = generate(&req).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_generate_from_bytes() {
        let bytes = request(&[orders_file()], &["oms/v1/oms.proto"], None).encode_to_vec();
        let response = generate_from_bytes(&bytes).unwrap();
        assert_eq!(response.file.len(), 1);
        assert!(generate_from_bytes(&[0x0a]).is_err());
    }

    fn oms_package() -> GoPackage {
        GoPackage {
            import_path: "example.com/gen/oms/v1".to_string(),
            name: "oms".to_string(),
        }
    }

    #[test]
    fn test_output_file_name() {
        let pkg = oms_package();
        let mut options = GenerationOptions::default();
        assert_eq!(
            output_file_name("oms/v1/oms.proto", &pkg, &pkg, &options).unwrap(),
            "example.com/gen/oms/v1/oms_nexus.pb.go"
        );

        options.paths = PathMode::SourceRelative;
        assert_eq!(
            output_file_name("oms/v1/oms.proto", &pkg, &pkg, &options).unwrap(),
            "oms/v1/oms_nexus.pb.go"
        );
        assert_eq!(output_file_name("oms", &pkg, &pkg, &options).unwrap(), "oms_nexus.pb.go");

        options.paths = PathMode::Import;
        options.file_suffix = ".nexus.go".to_string();
        assert_eq!(
            output_file_name("oms/v1/oms.proto", &pkg, &pkg, &options).unwrap(),
            "example.com/gen/oms/v1/oms.nexus.go"
        );
    }

    #[test]
    fn test_output_file_name_with_package_override() {
        let source = oms_package();
        let output = source.output_package(Some("omsnexus"));
        let mut options = GenerationOptions::default();
        assert_eq!(
            output_file_name("oms/v1/oms.proto", &source, &output, &options).unwrap(),
            "example.com/gen/oms/v1/omsnexus/oms_nexus.pb.go"
        );

        options.paths = PathMode::SourceRelative;
        assert_eq!(
            output_file_name("oms/v1/oms.proto", &source, &output, &options).unwrap(),
            "oms/v1/omsnexus/oms_nexus.pb.go"
        );
        assert_eq!(
            output_file_name("oms.proto", &source, &output, &options).unwrap(),
            "omsnexus/oms_nexus.pb.go"
        );
    }

    #[test]
    fn test_output_file_name_strips_module() {
        let pkg = oms_package();
        let mut options = GenerationOptions::default();
        options.module = Some("example.com/gen".to_string());
        assert_eq!(
            output_file_name("oms/v1/oms.proto", &pkg, &pkg, &options).unwrap(),
            "oms/v1/oms_nexus.pb.go"
        );

        // A prefix that only matches part of a path element does not count.
        options.module = Some("example.com/ge".to_string());
        let err = output_file_name("oms/v1/oms.proto", &pkg, &pkg, &options).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref key, .. } if key == "module"));

        options.module = Some("github.com/other".to_string());
        let err = output_file_name("oms/v1/oms.proto", &pkg, &pkg, &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for option \"module\": import path example.com/gen/oms/v1 is outside module github.com/other"
        );
    }

    #[test]
    fn test_package_override_imports_source_package() {
        let response = generate(&request(
            &[orders_file()],
            &["oms/v1/oms.proto"],
            Some("package=omsnexus"),
        ))
        .unwrap();
        assert_eq!(response.error, None);
        assert_eq!(response.file[0].name(), "example.com/gen/oms/v1/omsnexus/oms_nexus.pb.go");
        let content = response.file[0].content();
        assert!(content.contains("package omsnexus\n"));
        assert!(content.contains("\toms \"example.com/gen/oms/v1\"\n"));
        assert!(content.contains("*oms.CreateOrderInput"));
    }

    #[test]
    fn test_format_version() {
        let version = Version {
            major: Some(5),
            minor: Some(27),
            patch: Some(1),
            suffix: Some(String::new()),
        };
        assert_eq!(format_version(&version), "v5.27.1");

        let rc = Version {
            suffix: Some("rc1".to_string()),
            ..version
        };
        assert_eq!(format_version(&rc), "v5.27.1-rc1");
    }

    #[test]
    fn test_compiler_version_in_header() {
        let mut req = request(&[orders_file()], &["oms/v1/oms.proto"], None);
        req.compiler_version = Some(Version {
            major: Some(5),
            minor: Some(27),
            patch: Some(1),
            suffix: None,
        });
        let response = generate(&req).unwrap();
        assert!(response.file[0].content().contains("// \tprotoc v5.27.1\n"));
    }
}
