//! Format-independent model of the services being generated.

/// One RPC service declared in the file being generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Fully-qualified name without the leading dot (e.g. `oms.v1.Orders`)
    pub full_name: String,
    /// Short name as declared (e.g. `Orders`)
    pub name: String,
    /// Proto package of the declaring file
    pub package: String,
    /// Declaring proto file
    pub file: String,
    /// Runtime service name from the `nexus.temporal.v1.service` option
    pub name_override: Option<String>,
    /// Operations in declaration order
    pub operations: Vec<OperationDescriptor>,
}

impl ServiceDescriptor {
    /// Name the runtime dispatches the service under.
    pub fn runtime_name(&self) -> &str {
        self.name_override.as_deref().unwrap_or(&self.full_name)
    }
}

/// One unary RPC method reinterpreted as an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Method name as declared
    pub method_name: String,
    /// Fully-qualified input message name, as it appears in the descriptor
    pub input_type: String,
    /// Fully-qualified output message name, as it appears in the descriptor
    pub output_type: String,
    pub options: OperationOptions,
}

/// Per-operation generation options read from method options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationOptions {
    /// Explicit runtime operation name; wins over the configured template
    pub name: Option<String>,
}
