//! Verify command implementation.

use sensorseal_ledger::{RpcLedger, TxSignature};
use sensorseal_pipeline::{Settings, VerificationReport, VerificationVerdict, Verifier};
use sensorseal_store::PinataStore;
use tracing::debug;

use crate::input::read_request;
use crate::output::format_json;

pub async fn run(
    input: Option<String>,
    signature: String,
    fetch: bool,
    strict: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let signature: TxSignature = signature
        .trim()
        .parse()
        .map_err(|e| format!("Invalid signature: {}", e))?;

    // Readings are validated before anything goes over the network.
    let readings = if fetch {
        None
    } else {
        Some(read_request(input.as_deref())?.readings()?)
    };

    let settings = Settings::from_env()?;
    debug!(?settings, fetch, "loaded settings");
    let ledger = RpcLedger::new(settings.rpc()?);
    let verifier = Verifier::new(settings.program_id()?);

    let report = match readings {
        Some(readings) => {
            verifier
                .verify_checkpoint(&ledger, &signature, &readings)
                .await?
        }
        None => {
            let store = PinataStore::new(settings.gateway());
            let key = settings.envelope_key()?;
            let (_, report) = verifier
                .verify_fetched(&ledger, &store, &key, &signature)
                .await?;
            report
        }
    };

    if json_output {
        println!("{}", format_json(&report));
    } else {
        print_report(&report);
    }

    if strict && report.verdict != VerificationVerdict::Match {
        std::process::exit(1);
    }
    Ok(())
}

#[allow(clippy::print_literal)]
fn print_report(report: &VerificationReport) {
    println!("{:<16} {}", "SIGNATURE", report.signature);
    println!("{:<16} {:?}", "VERDICT", report.verdict);
    println!("{:<16} {}", "READINGS", report.count);
    println!("{:<16} {}", "COMPUTED_ROOT", report.computed_root);
    if let Some(root) = &report.committed_root {
        println!("{:<16} {}", "COMMITTED_ROOT", root);
    }
    if let Some(cid) = &report.content_identifier {
        println!("{:<16} {}", "CID", cid);
    }
}
