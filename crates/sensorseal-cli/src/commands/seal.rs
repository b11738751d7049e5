//! Seal command implementation.

use sensorseal_envelope::seal;
use sensorseal_pipeline::Settings;

use crate::input::read_json;
use crate::output::format_json;

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let document = read_json(input.as_deref())?;
    let key = Settings::from_env()?.envelope_key()?;
    let envelope = seal(&document, &key)?;
    println!("{}", format_json(&envelope));
    Ok(())
}
