//! Request validation, run before anything is registered or sent.

use crate::types::{RequestDescriptor, KNOWN_METHODS};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;

fn validate_url(desc: &RequestDescriptor) -> Result<()> {
    if desc.url.trim().is_empty() {
        return Err(Error::validation_with_context(
            "request url must not be empty",
            ErrorContext::new()
                .with_field_path("request.url")
                .with_source("request_validator"),
        ));
    }
    Ok(())
}

/// Expects the method to be lowercased already.
fn validate_method(desc: &RequestDescriptor) -> Result<()> {
    if !KNOWN_METHODS.contains(&desc.method.as_str()) {
        return Err(Error::validation_with_context(
            format!(
                "Unsupported request method: {}. Supported: {:?}",
                desc.method, KNOWN_METHODS
            ),
            ErrorContext::new()
                .with_field_path("request.method")
                .with_source("request_validator"),
        ));
    }
    Ok(())
}

fn validate_params(desc: &RequestDescriptor) -> Result<()> {
    match &desc.params {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(other) => Err(Error::validation_with_context(
            "request params must be an object",
            ErrorContext::new()
                .with_field_path("request.params")
                .with_details(format!("got {}", json_kind(other)))
                .with_source("request_validator"),
        )),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn validate_request(desc: &RequestDescriptor) -> Result<()> {
    validate_url(desc)?;
    validate_method(desc)?;
    validate_params(desc)
}
