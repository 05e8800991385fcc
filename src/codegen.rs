//! Go source emitter.
//!
//! Output depends only on its inputs: services and operations are emitted in
//! declaration order and imports in import-path order, so regenerating from the
//! same descriptors is byte-for-byte stable.

use crate::model::ServiceDescriptor;
use crate::naming::{OperationNames, ServiceNames};
use crate::types::{
    ImportSet, MappedType, NEXUS_IMPORT_PATH, WORKER_IMPORT_PATH, WORKFLOW_IMPORT_PATH,
};

/// Name the plugin identifies itself with in generated headers.
pub const PLUGIN_NAME: &str = "protoc-gen-go_nexus-temporal";

/// File-level inputs to [`render_file`].
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'a> {
    /// Proto file the output was generated from
    pub source: &'a str,
    /// Go package clause
    pub package_name: &'a str,
    pub plugin_version: &'a str,
    /// `vX.Y.Z` of the invoking protoc, when it reported one
    pub compiler_version: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct GeneratedOperation<'a> {
    pub method_name: &'a str,
    pub names: OperationNames,
    pub input: MappedType<'a>,
    pub output: MappedType<'a>,
}

#[derive(Debug, Clone)]
pub struct GeneratedService<'a> {
    pub descriptor: &'a ServiceDescriptor,
    pub names: ServiceNames,
    pub operations: Vec<GeneratedOperation<'a>>,
}

/// Framework package qualifiers as allocated in the import set.
struct Framework<'a> {
    nexus: &'a str,
    worker: &'a str,
    workflow: &'a str,
}

impl<'a> Framework<'a> {
    fn from_imports(imports: &'a ImportSet) -> Self {
        Self {
            nexus: imports.alias(NEXUS_IMPORT_PATH).unwrap_or("nexus"),
            worker: imports.alias(WORKER_IMPORT_PATH).unwrap_or("worker"),
            workflow: imports.alias(WORKFLOW_IMPORT_PATH).unwrap_or("workflow"),
        }
    }
}

/// Render one Go source file holding every service of a proto file.
pub fn render_file(ctx: &FileContext<'_>, imports: &ImportSet, services: &[GeneratedService<'_>]) -> String {
    let fw = Framework::from_imports(imports);

    let mut buf = String::new();
    buf.push_str(&format!("// Code generated by {PLUGIN_NAME}. DO NOT EDIT.\n"));
    buf.push_str("// versions:\n");
    buf.push_str(&format!("// \t{PLUGIN_NAME} v{}\n", ctx.plugin_version));
    if let Some(protoc) = ctx.compiler_version {
        buf.push_str(&format!("// \tprotoc {protoc}\n"));
    }
    buf.push_str(&format!("// source: {}\n\n", ctx.source));
    buf.push_str(&format!("package {}\n\n", ctx.package_name));

    buf.push_str("import (\n");
    for (path, alias) in imports.iter() {
        buf.push_str(&format!("\t{alias} {}\n", go_string_literal(path)));
    }
    buf.push_str(")\n");

    for service in services {
        render_service(&mut buf, &fw, service);
    }

    buf
}

fn render_service(buf: &mut String, fw: &Framework<'_>, service: &GeneratedService<'_>) {
    let full_name = &service.descriptor.full_name;
    let names = &service.names;

    buf.push_str(&format!(
        "\n// {} is the Nexus service name of {full_name}.\n",
        names.service_name_const
    ));
    buf.push_str(&format!(
        "const {} = {}\n",
        names.service_name_const,
        go_string_literal(service.descriptor.runtime_name())
    ));

    for op in &service.operations {
        buf.push_str(&format!(
            "\n// {} is the Nexus operation name of {full_name}.{}.\n",
            op.names.operation_name_const, op.method_name
        ));
        buf.push_str(&format!(
            "const {} = {}\n",
            op.names.operation_name_const,
            go_string_literal(&op.names.operation_name)
        ));
    }

    render_client(buf, fw, service);
    render_handler(buf, fw, service);
    render_register(buf, fw, service);
}

fn render_client(buf: &mut String, fw: &Framework<'_>, service: &GeneratedService<'_>) {
    let names = &service.names;
    let client = &names.client;
    let workflow = fw.workflow;

    buf.push_str(&format!(
        "\n// {client} invokes {} operations from workflow code.\n",
        service.descriptor.full_name
    ));
    buf.push_str(&format!("type {client} struct {{\n"));
    buf.push_str(&format!("\tclient {workflow}.NexusClient\n"));
    buf.push_str("}\n\n");

    buf.push_str(&format!(
        "// {} creates a {client} that calls the given Nexus endpoint.\n",
        names.client_constructor
    ));
    buf.push_str(&format!(
        "func {}(endpoint string) *{client} {{\n",
        names.client_constructor
    ));
    buf.push_str(&format!(
        "\treturn &{client}{{client: {workflow}.NewNexusClient(endpoint, {})}}\n",
        names.service_name_const
    ));
    buf.push_str("}\n");

    for op in &service.operations {
        let input = &op.input.expr;
        let output = &op.output.expr;
        let params = format!(
            "ctx {workflow}.Context, input *{input}, options {workflow}.NexusOperationOptions"
        );

        buf.push_str(&format!(
            "\n// {} starts the {} operation and returns a future for its result.\n",
            op.names.start, op.method_name
        ));
        buf.push_str(&format!(
            "func (c *{client}) {}({params}) {workflow}.NexusOperationFuture {{\n",
            op.names.start
        ));
        buf.push_str(&format!(
            "\treturn c.client.ExecuteOperation(ctx, {}, input, options)\n",
            op.names.operation_name_const
        ));
        buf.push_str("}\n");

        buf.push_str(&format!(
            "\n// {} runs the {} operation and waits for its result.\n",
            op.names.execute, op.method_name
        ));
        buf.push_str(&format!(
            "func (c *{client}) {}({params}) (*{output}, error) {{\n",
            op.names.execute
        ));
        buf.push_str(&format!("\toutput := &{output}{{}}\n"));
        buf.push_str(&format!(
            "\tif err := c.{}(ctx, input, options).Get(ctx, output); err != nil {{\n",
            op.names.start
        ));
        buf.push_str("\t\treturn nil, err\n");
        buf.push_str("\t}\n");
        buf.push_str("\treturn output, nil\n");
        buf.push_str("}\n");
    }
}

fn render_handler(buf: &mut String, fw: &Framework<'_>, service: &GeneratedService<'_>) {
    let handler = &service.names.handler;

    buf.push_str(&format!(
        "\n// {handler} provides the implementation of each {} operation.\n",
        service.descriptor.full_name
    ));
    buf.push_str(&format!("type {handler} interface {{\n"));
    for (idx, op) in service.operations.iter().enumerate() {
        if idx > 0 {
            buf.push('\n');
        }
        buf.push_str(&format!(
            "\t// {} returns the {} operation registered under name.\n",
            op.names.handler_method, op.method_name
        ));
        buf.push_str(&format!(
            "\t{}(name string) {}.Operation[*{}, *{}]\n",
            op.names.handler_method, fw.nexus, op.input.expr, op.output.expr
        ));
    }
    buf.push_str("}\n");
}

fn render_register(buf: &mut String, fw: &Framework<'_>, service: &GeneratedService<'_>) {
    let names = &service.names;

    buf.push_str(&format!(
        "\n// {} registers every {} operation of handler with registry.\n",
        names.register, service.descriptor.full_name
    ));
    buf.push_str(&format!(
        "func {}(registry {}.NexusServiceRegistry, handler {}) error {{\n",
        names.register, fw.worker, names.handler
    ));
    buf.push_str(&format!(
        "\tservice := {}.NewService({})\n",
        fw.nexus, names.service_name_const
    ));
    if !service.operations.is_empty() {
        buf.push_str("\tif err := service.Register(\n");
        for op in &service.operations {
            buf.push_str(&format!(
                "\t\thandler.{}({}),\n",
                op.names.handler_method, op.names.operation_name_const
            ));
        }
        buf.push_str("\t); err != nil {\n");
        buf.push_str("\t\treturn err\n");
        buf.push_str("\t}\n");
    }
    buf.push_str("\tregistry.RegisterNexusService(service)\n");
    buf.push_str("\treturn nil\n");
    buf.push_str("}\n");
}

/// Quote `s` as a Go interpreted string literal.
pub fn go_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{code:02x}"));
                } else {
                    out.push_str(&format!("\\u{code:04x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
