//! Legacy transaction wire format.
//!
//! ```text
//! transaction := compact(n) signature*n message
//! message     := header(3) compact(k) pubkey*k blockhash compact(m) instruction*m
//! instruction := program_index(u8) compact(a) account_index*a compact(d) data
//! ```
//!
//! `compact` is the 1-3 byte little-endian base-128 length prefix. Accounts are
//! ordered writable signers, read-only signers, writable non-signers, read-only
//! non-signers; the fee payer is always first.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};

use crate::errors::LedgerError;
use crate::instruction::Instruction;
use crate::pubkey::{Blockhash, Pubkey, TxSignature};

/// Appends a compact-u16 length prefix.
pub fn encode_len(out: &mut Vec<u8>, len: usize) -> Result<(), LedgerError> {
    let mut rem = u16::try_from(len)
        .map_err(|_| LedgerError::Encoding(format!("list of {len} entries exceeds u16")))?;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Reads a compact-u16 length prefix starting at `*cursor`.
pub fn decode_len(bytes: &[u8], cursor: &mut usize) -> Result<usize, LedgerError> {
    let mut value: usize = 0;
    for shift in [0u32, 7, 14] {
        let byte = *bytes
            .get(*cursor)
            .ok_or_else(|| LedgerError::Encoding("truncated length prefix".to_owned()))?;
        *cursor += 1;
        value |= usize::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            if value > usize::from(u16::MAX) {
                break;
            }
            return Ok(value);
        }
    }
    Err(LedgerError::Encoding("length prefix overflows u16".to_owned()))
}

/// Signature and read-only counts at the front of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    /// Leading account keys that must sign.
    pub num_required_signatures: u8,
    /// Trailing signer keys that are read-only.
    pub num_readonly_signed_accounts: u8,
    /// Trailing non-signer keys that are read-only.
    pub num_readonly_unsigned_accounts: u8,
}

/// Instruction with accounts replaced by indexes into the message key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index of the program key.
    pub program_id_index: u8,
    /// Indexes of the accounts, in instruction order.
    pub accounts: Vec<u8>,
    /// Instruction data.
    pub data: Vec<u8>,
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Signer and read-only counts.
    pub header: MessageHeader,
    /// Deduplicated account table.
    pub account_keys: Vec<Pubkey>,
    /// Blockhash the transaction expires with.
    pub recent_blockhash: Blockhash,
    /// Compiled instructions.
    pub instructions: Vec<CompiledInstruction>,
}

struct KeyEntry {
    pubkey: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl Message {
    /// Compiles instructions into a message paid for by `payer`.
    pub fn compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: Blockhash,
    ) -> Result<Self, LedgerError> {
        let mut entries = vec![KeyEntry {
            pubkey: *payer,
            is_signer: true,
            is_writable: true,
        }];
        let mut upsert = |pubkey: Pubkey, is_signer: bool, is_writable: bool| {
            match entries.iter_mut().find(|e| e.pubkey == pubkey) {
                Some(entry) => {
                    entry.is_signer |= is_signer;
                    entry.is_writable |= is_writable;
                }
                None => entries.push(KeyEntry {
                    pubkey,
                    is_signer,
                    is_writable,
                }),
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Payer stays at index 0: it is a writable signer and was inserted first.
        let rank = |e: &KeyEntry| match (e.is_signer, e.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        entries.sort_by_key(rank);

        if entries.len() > usize::from(u8::MAX) {
            return Err(LedgerError::Encoding(format!(
                "{} accounts exceed the message limit",
                entries.len()
            )));
        }

        let count = |f: fn(&KeyEntry) -> bool| entries.iter().filter(|e| f(e)).count() as u8;
        let header = MessageHeader {
            num_required_signatures: count(|e| e.is_signer),
            num_readonly_signed_accounts: count(|e| e.is_signer && !e.is_writable),
            num_readonly_unsigned_accounts: count(|e| !e.is_signer && !e.is_writable),
        };
        let account_keys: Vec<Pubkey> = entries.into_iter().map(|e| e.pubkey).collect();

        let index_of = |key: &Pubkey| -> Result<u8, LedgerError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| LedgerError::Encoding(format!("account {key} missing from table")))
        };
        let compiled = instructions
            .iter()
            .map(|ix| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&ix.program_id)?,
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|m| index_of(&m.pubkey))
                        .collect::<Result<_, _>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        let n = usize::from(self.header.num_required_signatures).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// Whether the key at `index` may be modified.
    pub fn is_writable(&self, index: usize) -> bool {
        let keys = self.account_keys.len();
        let signers = usize::from(self.header.num_required_signatures);
        if index >= keys {
            return false;
        }
        if index < signers {
            index < signers.saturating_sub(usize::from(self.header.num_readonly_signed_accounts))
        } else {
            index < keys.saturating_sub(usize::from(self.header.num_readonly_unsigned_accounts))
        }
    }

    /// Bytes covered by the signatures.
    pub fn serialize(&self) -> Result<Vec<u8>, LedgerError> {
        let mut out = vec![
            self.header.num_required_signatures,
            self.header.num_readonly_signed_accounts,
            self.header.num_readonly_unsigned_accounts,
        ];
        encode_len(&mut out, self.account_keys.len())?;
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(self.recent_blockhash.as_bytes());
        encode_len(&mut out, self.instructions.len())?;
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_len(&mut out, ix.accounts.len())?;
            out.extend_from_slice(&ix.accounts);
            encode_len(&mut out, ix.data.len())?;
            out.extend_from_slice(&ix.data);
        }
        Ok(out)
    }

    fn deserialize(bytes: &[u8], cursor: &mut usize) -> Result<Self, LedgerError> {
        let header = MessageHeader {
            num_required_signatures: take(bytes, cursor, 1)?[0],
            num_readonly_signed_accounts: take(bytes, cursor, 1)?[0],
            num_readonly_unsigned_accounts: take(bytes, cursor, 1)?[0],
        };
        let key_count = decode_len(bytes, cursor)?;
        let account_keys = (0..key_count)
            .map(|_| Pubkey::try_from(take(bytes, cursor, Pubkey::LEN)?))
            .collect::<Result<Vec<_>, _>>()?;
        let recent_blockhash = Blockhash::try_from(take(bytes, cursor, Blockhash::LEN)?)?;
        let ix_count = decode_len(bytes, cursor)?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_id_index = take(bytes, cursor, 1)?[0];
            let n = decode_len(bytes, cursor)?;
            let accounts = take(bytes, cursor, n)?.to_vec();
            let n = decode_len(bytes, cursor)?;
            let data = take(bytes, cursor, n)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }
        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

fn take<'a>(bytes: &'a [u8], cursor: &mut usize, n: usize) -> Result<&'a [u8], LedgerError> {
    let end = cursor
        .checked_add(n)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| LedgerError::Encoding("transaction truncated".to_owned()))?;
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

/// Signed transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    signatures: Vec<TxSignature>,
    message: Message,
}

impl Transaction {
    /// Signs `message` with every key it requires.
    ///
    /// Each required signer must be present in `keys`; extra keys are ignored.
    pub fn sign(message: Message, keys: &[&SigningKey]) -> Result<Self, LedgerError> {
        let payload = message.serialize()?;
        let signatures = message
            .signer_keys()
            .iter()
            .map(|required| {
                let key = keys
                    .iter()
                    .find(|k| k.verifying_key().as_bytes() == required.as_bytes())
                    .ok_or_else(|| {
                        LedgerError::InvalidSigner(format!("no key available for signer {required}"))
                    })?;
                Ok(TxSignature::new(key.sign(&payload).to_bytes()))
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;
        Ok(Self {
            signatures,
            message,
        })
    }

    /// Signatures in signer order.
    pub fn signatures(&self) -> &[TxSignature] {
        &self.signatures
    }

    /// First signature, which names the transaction on the ledger.
    pub fn id(&self) -> Option<&TxSignature> {
        self.signatures.first()
    }

    /// Signed message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Checks every signature against its signer key.
    pub fn verify(&self) -> bool {
        let Ok(payload) = self.message.serialize() else {
            return false;
        };
        let signers = self.message.signer_keys();
        signers.len() == self.signatures.len()
            && signers.iter().zip(&self.signatures).all(|(key, sig)| {
                VerifyingKey::from_bytes(key.as_bytes())
                    .map(|vk| {
                        vk.verify(&payload, &Signature::from_bytes(sig.as_bytes()))
                            .is_ok()
                    })
                    .unwrap_or(false)
            })
    }

    /// Encodes the transaction for `sendTransaction`.
    pub fn to_wire(&self) -> Result<Vec<u8>, LedgerError> {
        let mut out = Vec::new();
        encode_len(&mut out, self.signatures.len())?;
        for sig in &self.signatures {
            out.extend_from_slice(sig.as_bytes());
        }
        out.extend_from_slice(&self.message.serialize()?);
        Ok(out)
    }

    /// Decodes a wire transaction, rejecting trailing bytes.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, LedgerError> {
        let mut cursor = 0;
        let sig_count = decode_len(bytes, &mut cursor)?;
        let signatures = (0..sig_count)
            .map(|_| TxSignature::try_from(take(bytes, &mut cursor, TxSignature::LEN)?))
            .collect::<Result<Vec<_>, _>>()?;
        let message = Message::deserialize(bytes, &mut cursor)?;
        if cursor != bytes.len() {
            return Err(LedgerError::Encoding(format!(
                "{} trailing bytes after message",
                bytes.len() - cursor
            )));
        }
        Ok(Self {
            signatures,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{commit_checkpoint, memo, MEMO_PROGRAM_ID};
    use sensorseal_canonical::{ContentIdentifier, Hash32};

    fn compact(len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        encode_len(&mut out, len).unwrap();
        out
    }

    #[test]
    fn compact_u16_known_encodings() {
        assert_eq!(compact(0), vec![0x00]);
        assert_eq!(compact(0x7f), vec![0x7f]);
        assert_eq!(compact(0x80), vec![0x80, 0x01]);
        assert_eq!(compact(0x3fff), vec![0xff, 0x7f]);
        assert_eq!(compact(0x4000), vec![0x80, 0x80, 0x01]);
        assert_eq!(compact(0xffff), vec![0xff, 0xff, 0x03]);
        assert!(encode_len(&mut Vec::new(), 0x1_0000).is_err());
    }

    #[test]
    fn compact_u16_decode_reads_what_encode_wrote() {
        for len in [0usize, 1, 127, 128, 300, 16_384, 65_535] {
            let bytes = compact(len);
            let mut cursor = 0;
            assert_eq!(decode_len(&bytes, &mut cursor).unwrap(), len);
            assert_eq!(cursor, bytes.len());
        }
        let mut cursor = 0;
        assert!(decode_len(&[0x80], &mut cursor).is_err());
        let mut cursor = 0;
        assert!(decode_len(&[0xff, 0xff, 0x7f], &mut cursor).is_err());
    }

    fn commit_message(authority: Pubkey) -> Message {
        let program = Pubkey::new([9; 32]);
        let device = Pubkey::new([2; 32]);
        let checkpoint = Pubkey::new([3; 32]);
        let instructions = vec![
            memo(&ContentIdentifier::parse("bafkreiabc").unwrap()),
            commit_checkpoint(program, device, checkpoint, authority, &Hash32::new([7; 32])),
        ];
        Message::compile(&authority, &instructions, Blockhash::new([4; 32])).unwrap()
    }

    #[test]
    fn compile_orders_accounts_and_counts_header() {
        let authority = Pubkey::new([1; 32]);
        let message = commit_message(authority);

        assert_eq!(
            message.account_keys,
            vec![
                authority,
                Pubkey::new([3; 32]),
                MEMO_PROGRAM_ID,
                Pubkey::new([2; 32]),
                Pubkey::new([9; 32]),
            ]
        );
        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 3,
            }
        );
        assert!(message.is_writable(0));
        assert!(message.is_writable(1));
        assert!(!message.is_writable(2));

        assert_eq!(message.instructions[0].program_id_index, 2);
        assert!(message.instructions[0].accounts.is_empty());
        assert_eq!(message.instructions[1].program_id_index, 4);
        assert_eq!(message.instructions[1].accounts, vec![3, 1, 0]);
    }

    #[test]
    fn signed_transaction_verifies_and_decodes() {
        let key = SigningKey::from_bytes(&[42u8; 32]);
        let authority = Pubkey::new(key.verifying_key().to_bytes());
        let tx = Transaction::sign(commit_message(authority), &[&key]).unwrap();

        assert_eq!(tx.signatures().len(), 1);
        assert!(tx.verify());

        let wire = tx.to_wire().unwrap();
        assert_eq!(wire[0], 1);
        assert_eq!(Transaction::from_wire(&wire).unwrap(), tx);

        let mut trailing = wire.clone();
        trailing.push(0);
        assert!(Transaction::from_wire(&trailing).is_err());
        assert!(Transaction::from_wire(&wire[..wire.len() - 1]).is_err());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let key = SigningKey::from_bytes(&[42u8; 32]);
        let authority = Pubkey::new(key.verifying_key().to_bytes());
        let tx = Transaction::sign(commit_message(authority), &[&key]).unwrap();

        let mut wire = tx.to_wire().unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0xff;
        assert!(!Transaction::from_wire(&wire).unwrap().verify());
    }

    #[test]
    fn signing_without_required_key_fails() {
        let other = SigningKey::from_bytes(&[1u8; 32]);
        let message = commit_message(Pubkey::new([1; 32]));
        assert!(matches!(
            Transaction::sign(message, &[&other]),
            Err(LedgerError::InvalidSigner(_))
        ));
    }
}
