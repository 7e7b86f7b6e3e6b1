use std::io;

use agendar_client::{ClientError, SuccessEnvelope};
use serde::Serialize;
use serde_json::{Value, json};

const JSON_VERSION: &str = "v1";

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    let value = json!({
        "ok": true,
        "version": JSON_VERSION,
        "data": success.data.clone(),
    });
    serialize_json_pretty(&value)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    let mut body = json!({
        "code": error.code,
        "message": error.message,
        "recovery_steps": error.recovery_steps,
    });
    if let (Some(data), Value::Object(map)) = (&error.data, &mut body) {
        map.insert("data".to_string(), data.clone());
    }
    serialize_json_pretty(&json!({ "error": body }))
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}
