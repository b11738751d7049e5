//! Input loading shared by the commands.

use sensorseal_pipeline::RunRequest;
use serde_json::Value;
use std::io::{self, Read};

/// Reads a file, or stdin when no path is given.
pub fn read_input(input: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read file {}: {}", path, e).into()),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Reads a JSON document.
pub fn read_json(input: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let text = read_input(input)?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid JSON: {}", e).into())
}

/// Reads a run request. A bare array is taken as the readings.
pub fn read_request(input: Option<&str>) -> Result<RunRequest, Box<dyn std::error::Error>> {
    match read_json(input)? {
        readings @ Value::Array(_) => Ok(RunRequest {
            readings,
            ..Default::default()
        }),
        request @ Value::Object(_) => Ok(serde_json::from_value(request)?),
        _ => Err("Input must be a readings array or a run request object".into()),
    }
}
