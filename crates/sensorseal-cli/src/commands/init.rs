//! Init command implementation.

use sensorseal_ledger::{
    CheckpointCommitter, DeviceAccounts, Pubkey, RpcLedger, ThresholdConfig, TxSignature,
};
use sensorseal_pipeline::Settings;
use serde_json::{json, Value};

use crate::output::format_json;

pub async fn run(
    authority: Option<String>,
    cfg: ThresholdConfig,
    submit: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    let program_id = settings.program_id()?;

    let (accounts, signature) = if submit {
        if authority.is_some() {
            return Err("--authority cannot be combined with --submit; the signer registers".into());
        }
        let signer = settings.signer()?;
        let ledger = RpcLedger::new(settings.rpc()?);
        let (accounts, signature) = CheckpointCommitter::new(program_id)
            .initialize_device(&ledger, &signer, &cfg)
            .await?;
        (accounts, Some(signature))
    } else {
        let authority: Pubkey = match authority {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|e| format!("Invalid authority: {}", e))?,
            None => settings.signer()?.pubkey(),
        };
        (DeviceAccounts::derive(&program_id, &authority)?, None)
    };

    println!("{}", format_json(&registration(&accounts, &cfg, signature)));
    Ok(())
}

fn registration(
    accounts: &DeviceAccounts,
    cfg: &ThresholdConfig,
    signature: Option<TxSignature>,
) -> Value {
    let [device_bump, feed_bump, score_bump, cp_bump] = accounts.bumps;
    json!({
        "authority": accounts.authority,
        "devicePda": accounts.device,
        "feedPda": accounts.feed,
        "scorePda": accounts.score,
        "checkpointPda": accounts.checkpoint,
        "bumps": {
            "deviceBump": device_bump,
            "feedBump": feed_bump,
            "scoreBump": score_bump,
            "cpBump": cp_bump,
        },
        "cfg": cfg,
        "signature": signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_names_every_account() {
        let accounts = DeviceAccounts::derive(&Pubkey::new([9; 32]), &Pubkey::new([2; 32])).unwrap();
        let value = registration(&accounts, &ThresholdConfig::default(), None);

        assert_eq!(value["checkpointPda"], accounts.checkpoint.to_string());
        assert_eq!(value["bumps"]["cpBump"], 255);
        assert_eq!(value["cfg"]["max_co2_ppm"], 1000);
        assert!(value["signature"].is_null());
    }
}
