use jsonschema::Validator;
use serde_json::{Map, Value};

use crate::error::{Result, RouterError};

pub(crate) fn compile(channel: &str, schema: &Value) -> Result<Validator> {
    jsonschema::validator_for(schema).map_err(|err| RouterError::SchemaCompile {
        channel: channel.to_owned(),
        message: err.to_string(),
    })
}

pub(crate) fn validate_payload(
    channel: &str,
    payload: &Map<String, Value>,
    validator: &Validator,
) -> Result<()> {
    let value = Value::Object(payload.clone());

    let mut errors = validator.iter_errors(&value);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(RouterError::ValidationFailed {
            channel: channel.to_owned(),
            message,
        });
    }

    Ok(())
}
