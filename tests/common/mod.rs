//! Request builders shared by the integration tests.
#![allow(dead_code)]

use nexus_temporal_codegen::RawCodeGeneratorRequest;
use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    descriptor_proto::ExtensionRange, DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileOptions, MethodDescriptorProto, ServiceDescriptorProto,
};

pub fn message(name: &str) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

pub fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

pub fn streaming(mut method: MethodDescriptorProto, client: bool, server: bool) -> MethodDescriptorProto {
    method.client_streaming = Some(client);
    method.server_streaming = Some(server);
    method
}

pub fn service(name: &str, methods: Vec<MethodDescriptorProto>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods,
        ..Default::default()
    }
}

pub fn file(
    name: &str,
    package: &str,
    go_package: &str,
    messages: Vec<DescriptorProto>,
    services: Vec<ServiceDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        syntax: Some("proto3".to_string()),
        message_type: messages,
        service: services,
        options: Some(FileOptions {
            go_package: Some(go_package.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `oms/v1/oms.proto`: service `oms.v1.Orders` with a single `CreateOrder`.
pub fn orders_file() -> FileDescriptorProto {
    file(
        "oms/v1/oms.proto",
        "oms.v1",
        "example.com/gen/oms/v1;oms",
        vec![message("CreateOrderInput"), message("CreateOrderOutput")],
        vec![service(
            "Orders",
            vec![method(
                "CreateOrder",
                ".oms.v1.CreateOrderInput",
                ".oms.v1.CreateOrderOutput",
            )],
        )],
    )
}

pub fn request(files: &[FileDescriptorProto], targets: &[&str], parameter: Option<&str>) -> RawCodeGeneratorRequest {
    raw_request(
        files.iter().map(|f| f.encode_to_vec()).collect(),
        targets,
        parameter,
    )
}

pub fn raw_request(proto_file: Vec<Vec<u8>>, targets: &[&str], parameter: Option<&str>) -> RawCodeGeneratorRequest {
    RawCodeGeneratorRequest {
        file_to_generate: targets.iter().map(|t| t.to_string()).collect(),
        parameter: parameter.map(str::to_string),
        compiler_version: None,
        proto_file,
    }
}

fn extendable(name: &str) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        extension_range: vec![ExtensionRange {
            start: Some(1000),
            end: Some(536_870_912),
            options: None,
        }],
        ..Default::default()
    }
}

/// The slice of `google/protobuf/descriptor.proto` the options file extends.
pub fn descriptor_proto() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/protobuf/descriptor.proto".to_string()),
        package: Some("google.protobuf".to_string()),
        syntax: Some("proto2".to_string()),
        message_type: vec![
            extendable("FileOptions"),
            extendable("MethodOptions"),
            extendable("ServiceOptions"),
        ],
        options: Some(FileOptions {
            go_package: Some("google.golang.org/protobuf/types/descriptorpb".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn string_field(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::String as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

fn extension(name: &str, type_name: &str, extendee: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(52001),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Message as i32),
        type_name: Some(type_name.to_string()),
        extendee: Some(extendee.to_string()),
        ..Default::default()
    }
}

/// `nexus/temporal/v1/options.proto`, as protoc would describe it.
pub fn options_proto() -> FileDescriptorProto {
    let with_name = |name: &str| DescriptorProto {
        field: vec![string_field("name", 1)],
        ..message(name)
    };
    FileDescriptorProto {
        name: Some("nexus/temporal/v1/options.proto".to_string()),
        package: Some("nexus.temporal.v1".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        syntax: Some("proto3".to_string()),
        message_type: vec![with_name("OperationOptions"), with_name("ServiceOptions")],
        extension: vec![
            extension(
                "operation",
                ".nexus.temporal.v1.OperationOptions",
                ".google.protobuf.MethodOptions",
            ),
            extension(
                "service",
                ".nexus.temporal.v1.ServiceOptions",
                ".google.protobuf.ServiceOptions",
            ),
        ],
        options: Some(FileOptions {
            go_package: Some("github.com/nexus-temporal/codegen/gen/nexus/temporal/v1;temporalv1".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// prost-types drops extension fields, so files that carry custom options are
// encoded through these wire-compatible mirrors instead.

#[derive(Clone, PartialEq, Message)]
pub struct NameOption {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AnnotatedMethodOptions {
    #[prost(message, optional, tag = "52001")]
    pub operation: Option<NameOption>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AnnotatedServiceOptions {
    #[prost(message, optional, tag = "52001")]
    pub service: Option<NameOption>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AnnotatedMethod {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub input_type: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub output_type: Option<String>,
    #[prost(message, optional, tag = "4")]
    pub options: Option<AnnotatedMethodOptions>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AnnotatedService {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub method: Vec<AnnotatedMethod>,
    #[prost(message, optional, tag = "3")]
    pub options: Option<AnnotatedServiceOptions>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AnnotatedFile {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub package: Option<String>,
    #[prost(string, repeated, tag = "3")]
    pub dependency: Vec<String>,
    #[prost(message, repeated, tag = "4")]
    pub message_type: Vec<DescriptorProto>,
    #[prost(message, repeated, tag = "6")]
    pub service: Vec<AnnotatedService>,
    #[prost(message, optional, tag = "8")]
    pub options: Option<FileOptions>,
    #[prost(string, optional, tag = "12")]
    pub syntax: Option<String>,
}

pub fn annotated_method(name: &str, input: &str, output: &str, operation: Option<&str>) -> AnnotatedMethod {
    AnnotatedMethod {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        options: operation.map(|op| AnnotatedMethodOptions {
            operation: Some(NameOption {
                name: Some(op.to_string()),
            }),
        }),
    }
}
