//! Open command implementation.

use sensorseal_envelope::{open, EncryptedEnvelope};
use sensorseal_pipeline::Settings;
use serde_json::Value;

use crate::input::read_input;
use crate::output::format_json;

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_input(input.as_deref())?;
    let envelope = EncryptedEnvelope::from_slice(text.as_bytes())?;
    let key = Settings::from_env()?.envelope_key()?;
    let document: Value = open(&envelope, &key)?;
    println!("{}", format_json(&document));
    Ok(())
}
