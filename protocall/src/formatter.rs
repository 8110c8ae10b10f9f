use colored::*;
use protocall_core::client::{CallError, ClientBuildError};
use protocall_core::schema::{MethodInfo, SchemaError, ServiceInfo};
use protocall_core::tonic::Status;
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct ServiceList(pub Vec<ServiceInfo>);

pub struct MethodList(pub ServiceInfo);

pub struct RowMarker(pub usize);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<Status> for FormattedString {
    fn from(status: Status) -> Self {
        FormattedString(format!(
            "{} code={:?} message={:?}",
            "gRPC Failed:".red().bold(),
            status.code(),
            status.message()
        ))
    }
}

impl From<ClientBuildError> for FormattedString {
    fn from(err: ClientBuildError) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Client Setup Failed:".red().bold(),
            err
        ))
    }
}

impl From<CallError> for FormattedString {
    fn from(err: CallError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Call Failed:".red().bold(), err))
    }
}

impl From<SchemaError> for FormattedString {
    fn from(err: SchemaError) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Failed to resolve proto sources:".red().bold(),
            err
        ))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}

impl From<ServiceList> for FormattedString {
    fn from(ServiceList(services): ServiceList) -> Self {
        if services.is_empty() {
            return FormattedString("No services found.".yellow().to_string());
        }

        let mut out = String::new();
        out.push_str("Available Services:\n");
        for svc in services {
            out.push_str(&format!("  - {}\n", svc.full_name.green()));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<MethodList> for FormattedString {
    fn from(MethodList(service): MethodList) -> Self {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {{\n",
            "service".cyan(),
            service.full_name.green()
        ));

        for method in &service.methods {
            out.push_str("  ");
            out.push_str(&method_line(method));
            out.push('\n');
        }
        out.push('}');
        FormattedString(out)
    }
}

fn method_line(method: &MethodInfo) -> String {
    let input_stream = if method.client_streaming {
        format!("{} ", "stream".cyan())
    } else {
        "".to_string()
    };
    let output_stream = if method.server_streaming {
        format!("{} ", "stream".cyan())
    } else {
        "".to_string()
    };

    format!(
        "{} {}({}{}) {} ({}{});",
        "rpc".cyan(),
        method.name.green(),
        input_stream,
        method.request_type.yellow(),
        "returns".cyan(),
        output_stream,
        method.response_type.yellow()
    )
}

impl From<RowMarker> for FormattedString {
    fn from(RowMarker(row): RowMarker) -> Self {
        FormattedString(format!("{} {}", "# row".cyan().bold(), row.to_string().cyan().bold()))
    }
}
