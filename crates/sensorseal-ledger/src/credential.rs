//! Signer credential decoding.
//!
//! Three encodings are tried in order and the first one that yields a usable
//! key wins:
//!
//! 1. a base58 secret string
//! 2. a JSON byte array holding a 64-byte secret key or a 32-byte seed
//! 3. a JSON byte array holding a 32-byte seed
//!
//! Decoded material longer than 64 bytes is retried as its trailing 64 bytes,
//! then its leading 64 bytes. A configured source that cannot be decoded does
//! not stop the chain; it only shapes the error if nothing else works.

use ed25519_dalek::SigningKey;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::errors::LedgerError;
use crate::pubkey::Pubkey;

const SECRET_KEY_LEN: usize = 64;
const SEED_LEN: usize = 32;

/// Raw credential inputs, usually read from the environment.
#[derive(Clone, Default)]
pub struct SignerSources {
    /// Base58 secret (`SOLANA_SECRET_BASE58`).
    pub secret_base58: Option<String>,
    /// JSON array of 64 or 32 bytes (`SOLANA_SECRET_KEY`).
    pub secret_key_json: Option<String>,
    /// JSON array of 32 bytes (`SOLANA_SECRET_SEED`).
    pub secret_seed_json: Option<String>,
}

impl std::fmt::Debug for SignerSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SignerSources")
            .field("secret_base58", &shown(&self.secret_base58))
            .field("secret_key_json", &shown(&self.secret_key_json))
            .field("secret_seed_json", &shown(&self.secret_seed_json))
            .finish()
    }
}

/// Which configured input produced the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `secret_base58`.
    Base58Secret,
    /// `secret_key_json`.
    SecretKeyArray,
    /// `secret_seed_json`.
    SeedArray,
}

/// Recovery applied to over-long key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFallback {
    /// Used the last 64 bytes.
    Tail64,
    /// Used the first 64 bytes.
    Head64,
}

/// A decoded signing key and how it was obtained.
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
    source: CredentialSource,
    fallback: Option<KeyFallback>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("pubkey", &self.pubkey())
            .field("source", &self.source)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl Signer {
    /// Builds a signer directly from a 32-byte seed.
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
            source: CredentialSource::SeedArray,
            fallback: None,
        }
    }

    /// Public key; also the authority and fee payer of commits.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.key.verifying_key().to_bytes())
    }

    /// Input the key came from.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Fallback used, if the material was over-long.
    pub fn fallback(&self) -> Option<KeyFallback> {
        self.fallback
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

type Parser = fn(&SignerSources) -> Option<Result<Signer, String>>;

const CHAIN: [Parser; 3] = [parse_base58, parse_secret_key_array, parse_seed_array];

/// Walks the credential chain and returns the first usable signer.
///
/// Fails with [`LedgerError::MissingSigner`] when nothing is configured and
/// [`LedgerError::InvalidSigner`] when every configured source is unusable.
pub fn resolve_signer(sources: &SignerSources) -> Result<Signer, LedgerError> {
    let mut rejected = Vec::new();
    for parse in CHAIN {
        match parse(sources) {
            None => continue,
            Some(Ok(signer)) => {
                debug!(source = ?signer.source, pubkey = %signer.pubkey(), "resolved signer");
                return Ok(signer);
            }
            Some(Err(reason)) => {
                debug!(%reason, "credential source rejected");
                rejected.push(reason);
            }
        }
    }
    if rejected.is_empty() {
        Err(LedgerError::MissingSigner)
    } else {
        Err(LedgerError::InvalidSigner(rejected.join("; ")))
    }
}

fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_base58(sources: &SignerSources) -> Option<Result<Signer, String>> {
    let text = configured(&sources.secret_base58)?;
    Some(
        bs58::decode(text)
            .into_vec()
            .map(Zeroizing::new)
            .map_err(|e| format!("SOLANA_SECRET_BASE58: {e}"))
            .and_then(|bytes| {
                keypair_from_bytes(&bytes, CredentialSource::Base58Secret)
                    .map_err(|e| format!("SOLANA_SECRET_BASE58: {e}"))
            }),
    )
}

fn parse_secret_key_array(sources: &SignerSources) -> Option<Result<Signer, String>> {
    let text = configured(&sources.secret_key_json)?;
    Some(json_bytes("SOLANA_SECRET_KEY", text).and_then(|bytes| {
        keypair_from_bytes(&bytes, CredentialSource::SecretKeyArray)
            .map_err(|e| format!("SOLANA_SECRET_KEY: {e}"))
    }))
}

fn parse_seed_array(sources: &SignerSources) -> Option<Result<Signer, String>> {
    let text = configured(&sources.secret_seed_json)?;
    Some(json_bytes("SOLANA_SECRET_SEED", text).and_then(|bytes| {
        if bytes.len() != SEED_LEN {
            return Err(format!(
                "SOLANA_SECRET_SEED: expected {SEED_LEN} bytes (got {})",
                bytes.len()
            ));
        }
        keypair_from_bytes(&bytes, CredentialSource::SeedArray)
            .map_err(|e| format!("SOLANA_SECRET_SEED: {e}"))
    }))
}

fn json_bytes(name: &str, text: &str) -> Result<Zeroizing<Vec<u8>>, String> {
    serde_json::from_str::<Vec<u8>>(text)
        .map(Zeroizing::new)
        .map_err(|e| format!("{name} is not a JSON byte array: {e}"))
}

fn from_keypair(bytes: &[u8]) -> Option<SigningKey> {
    let array: &[u8; SECRET_KEY_LEN] = bytes.try_into().ok()?;
    SigningKey::from_keypair_bytes(array).ok()
}

/// Turns raw key material into a signer.
///
/// 64 bytes are a secret key whose public half must match; 32 bytes are a
/// seed; anything longer is retried as its tail, then its head.
fn keypair_from_bytes(bytes: &[u8], source: CredentialSource) -> Result<Signer, String> {
    let signer = |key, fallback| Signer {
        key,
        source,
        fallback,
    };
    match bytes.len() {
        SECRET_KEY_LEN => from_keypair(bytes)
            .map(|key| signer(key, None))
            .ok_or_else(|| "public half does not match the secret".to_owned()),
        SEED_LEN => {
            let mut seed = Zeroizing::new([0u8; SEED_LEN]);
            seed.copy_from_slice(bytes);
            Ok(signer(SigningKey::from_bytes(&seed), None))
        }
        len if len > SECRET_KEY_LEN => {
            let attempts = [
                (KeyFallback::Tail64, &bytes[len - SECRET_KEY_LEN..]),
                (KeyFallback::Head64, &bytes[..SECRET_KEY_LEN]),
            ];
            for (fallback, window) in attempts {
                if let Some(key) = from_keypair(window) {
                    let resolved = signer(key, Some(fallback));
                    warn!(
                        len,
                        ?fallback,
                        pubkey = %resolved.pubkey(),
                        "over-long secret key, using fallback window"
                    );
                    return Ok(resolved);
                }
            }
            Err(format!(
                "{len}-byte key has no valid 64-byte window (need 64-byte secret key or 32-byte seed)"
            ))
        }
        len => Err(format!(
            "unsupported key length {len} (need 64-byte secret key or 32-byte seed)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair_bytes(seed: u8) -> Vec<u8> {
        SigningKey::from_bytes(&[seed; 32]).to_keypair_bytes().to_vec()
    }

    fn json(bytes: &[u8]) -> String {
        serde_json::to_string(bytes).unwrap()
    }

    fn expected_pubkey(seed: u8) -> Pubkey {
        Pubkey::new(SigningKey::from_bytes(&[seed; 32]).verifying_key().to_bytes())
    }

    #[test]
    fn nothing_configured_is_missing_signer() {
        assert!(matches!(
            resolve_signer(&SignerSources::default()),
            Err(LedgerError::MissingSigner)
        ));
        let blank = SignerSources {
            secret_base58: Some("   ".to_owned()),
            ..Default::default()
        };
        assert!(matches!(resolve_signer(&blank), Err(LedgerError::MissingSigner)));
    }

    #[test]
    fn base58_source_takes_priority() {
        let sources = SignerSources {
            secret_base58: Some(bs58::encode(keypair_bytes(1)).into_string()),
            secret_key_json: Some(json(&keypair_bytes(2))),
            secret_seed_json: Some(json(&[3u8; 32])),
        };
        let signer = resolve_signer(&sources).unwrap();
        assert_eq!(signer.source(), CredentialSource::Base58Secret);
        assert_eq!(signer.pubkey(), expected_pubkey(1));
        assert_eq!(signer.fallback(), None);
    }

    #[test]
    fn key_array_accepts_secret_key_or_seed() {
        let full = SignerSources {
            secret_key_json: Some(json(&keypair_bytes(2))),
            ..Default::default()
        };
        assert_eq!(resolve_signer(&full).unwrap().pubkey(), expected_pubkey(2));

        let seed = SignerSources {
            secret_key_json: Some(json(&[2u8; 32])),
            ..Default::default()
        };
        assert_eq!(resolve_signer(&seed).unwrap().pubkey(), expected_pubkey(2));
    }

    #[test]
    fn seed_array_is_the_last_resort() {
        let sources = SignerSources {
            secret_seed_json: Some(json(&[3u8; 32])),
            ..Default::default()
        };
        let signer = resolve_signer(&sources).unwrap();
        assert_eq!(signer.source(), CredentialSource::SeedArray);
        assert_eq!(signer.pubkey(), expected_pubkey(3));
    }

    #[test]
    fn unusable_source_falls_through_to_the_next() {
        let sources = SignerSources {
            secret_base58: Some("not-base58-0OIl".to_owned()),
            secret_key_json: None,
            secret_seed_json: Some(json(&[3u8; 32])),
        };
        let signer = resolve_signer(&sources).unwrap();
        assert_eq!(signer.source(), CredentialSource::SeedArray);
    }

    #[test]
    fn sixty_eight_bytes_use_the_trailing_window() {
        let mut material = vec![0xEEu8; 4];
        material.extend(keypair_bytes(5));
        assert_eq!(material.len(), 68);

        let sources = SignerSources {
            secret_key_json: Some(json(&material)),
            ..Default::default()
        };
        let signer = resolve_signer(&sources).unwrap();
        assert_eq!(signer.fallback(), Some(KeyFallback::Tail64));
        assert_eq!(signer.pubkey(), expected_pubkey(5));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn trailing_window_fallback_is_logged() {
        let mut material = vec![0xEEu8; 4];
        material.extend(keypair_bytes(5));
        let sources = SignerSources {
            secret_key_json: Some(json(&material)),
            ..Default::default()
        };

        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || resolve_signer(&sources).unwrap());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("over-long secret key"), "{output}");
        assert!(output.contains("Tail64"), "{output}");
        assert!(output.contains("68"), "{output}");
        assert!(output.contains(&expected_pubkey(5).to_string()), "{output}");
    }

    #[test]
    fn leading_window_is_tried_after_the_tail() {
        let mut material = keypair_bytes(6);
        material.extend([0xEEu8; 4]);

        let sources = SignerSources {
            secret_base58: Some(bs58::encode(&material).into_string()),
            ..Default::default()
        };
        let signer = resolve_signer(&sources).unwrap();
        assert_eq!(signer.fallback(), Some(KeyFallback::Head64));
        assert_eq!(signer.pubkey(), expected_pubkey(6));
    }

    #[test]
    fn unusable_material_is_invalid_signer() {
        let odd_length = SignerSources {
            secret_key_json: Some(json(&[1u8; 40])),
            ..Default::default()
        };
        assert!(matches!(
            resolve_signer(&odd_length),
            Err(LedgerError::InvalidSigner(reason)) if reason.contains("40")
        ));

        let no_window = SignerSources {
            secret_key_json: Some(json(&[1u8; 70])),
            ..Default::default()
        };
        assert!(matches!(
            resolve_signer(&no_window),
            Err(LedgerError::InvalidSigner(_))
        ));

        let seed_too_long = SignerSources {
            secret_seed_json: Some(json(&keypair_bytes(1))),
            ..Default::default()
        };
        assert!(matches!(
            resolve_signer(&seed_too_long),
            Err(LedgerError::InvalidSigner(_))
        ));
    }

    #[test]
    fn mismatched_public_half_is_rejected() {
        let mut material = keypair_bytes(7);
        material[63] ^= 0x01;
        let sources = SignerSources {
            secret_key_json: Some(json(&material)),
            ..Default::default()
        };
        assert!(matches!(
            resolve_signer(&sources),
            Err(LedgerError::InvalidSigner(_))
        ));
    }

    #[test]
    fn debug_output_hides_material() {
        let sources = SignerSources {
            secret_base58: Some("secretvalue".to_owned()),
            ..Default::default()
        };
        assert!(!format!("{sources:?}").contains("secretvalue"));
    }
}
