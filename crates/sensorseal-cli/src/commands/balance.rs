//! Balance command implementation.

use sensorseal_ledger::{Ledger, Pubkey, RpcLedger};
use sensorseal_pipeline::Settings;

use crate::output::format_sol;

pub async fn run(account: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    let account: Pubkey = match account {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| format!("Invalid account: {}", e))?,
        None => settings.signer()?.pubkey(),
    };

    let ledger = RpcLedger::new(settings.rpc()?);
    let lamports = ledger.get_balance(&account).await?;
    println!("{} {} lamports ({} SOL)", account, lamports, format_sol(lamports));
    Ok(())
}
