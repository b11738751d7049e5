//! Run command implementation.

use sensorseal_ledger::RpcLedger;
use sensorseal_pipeline::{BatchOrchestrator, Settings};
use sensorseal_store::PinataStore;
use tracing::debug;

use crate::input::read_request;
use crate::output::format_json;

pub async fn run(
    input: Option<String>,
    chunk_size: Option<i64>,
    device_ref: Option<String>,
    checkpoint_ref: Option<String>,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = read_request(input.as_deref())?;
    if chunk_size.is_some() {
        request.chunk_size = chunk_size;
    }
    if let Some(device_ref) = device_ref {
        request.refs.device_ref = device_ref;
    }
    if let Some(checkpoint_ref) = checkpoint_ref {
        request.refs.checkpoint_ref = checkpoint_ref;
    }

    // Input defects are reported before any configuration is required.
    let readings = request.readings()?;
    let chunk_size = request.chunk_size()?;
    request.refs.resolve()?;

    let settings = Settings::from_env()?;
    debug!(?settings, "loaded settings");
    let key = settings.envelope_key()?;
    let signer = settings.signer()?;
    let store = PinataStore::new(settings.pinata()?);
    let ledger = RpcLedger::new(settings.rpc()?);
    let orchestrator = BatchOrchestrator::new(key, settings.program_id()?, store, ledger);

    let result = orchestrator
        .run(&readings, chunk_size, &request.refs, &signer)
        .await?;

    println!("{}", format_json(&result));

    if strict && !result.all_committed() {
        std::process::exit(1);
    }
    Ok(())
}
