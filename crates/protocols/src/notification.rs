//! The notification-transaction codec: assembling and parsing the
//! `OP_RETURN` payload that bootstraps a BIP-47 payment channel.
//!
//! Transaction *signing* is out of scope (an external collaborator); this
//! module only shapes the unsigned transaction and hands the caller's
//! inputs back through [`SpendableInput`] for them to sign.

use bitcoin::script::PushBytesBuf;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing};
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use common::{NotificationParseError, Result, WalletError};
use crypto::ecdh::{blinding_mask, shared_secret, Outpoint};
use crypto::payment_code::PaymentCode;

/// An unspent output the caller is willing to spend as the notification
/// transaction's first input. Signing happens outside this crate.
pub trait SpendableInput {
    fn outpoint(&self) -> OutPoint;
    fn value(&self) -> Amount;
}

fn to_crypto_outpoint(outpoint: OutPoint) -> Outpoint {
    Outpoint {
        txid_le: outpoint.txid.to_byte_array(),
        vout: outpoint.vout,
    }
}

/// Build the unsigned notification transaction: dust output to the peer's
/// notification address, `OP_RETURN` output carrying the blinded payment
/// code, and one input per `inputs` (script_sig left empty for the caller
/// to sign).
pub fn build_notification_transaction<C: Signing>(
    secp: &Secp256k1<C>,
    inputs: &[impl SpendableInput],
    first_input_private_key: &SecretKey,
    sender_payment_code: &PaymentCode,
    peer_notification_pubkey: &PublicKey,
    peer_notification_address: &Address,
    min_non_dust: Amount,
) -> Result<Transaction> {
    let first = inputs.first().ok_or(WalletError::InsufficientMoney {
        needed: min_non_dust.to_sat(),
        available: 0,
    })?;

    let available: u64 = inputs.iter().map(|i| i.value().to_sat()).sum();
    if available < min_non_dust.to_sat() {
        return Err(WalletError::InsufficientMoney {
            needed: min_non_dust.to_sat(),
            available,
        });
    }

    let shared = shared_secret(secp, first_input_private_key, peer_notification_pubkey)?;
    let outpoint = to_crypto_outpoint(first.outpoint());
    let mask = blinding_mask(outpoint, &shared)?;
    let blinded = sender_payment_code.blind(&mask);

    let payload = PushBytesBuf::try_from(blinded.raw_payload().to_vec())
        .map_err(|e| WalletError::BadFormat(format!("op_return payload too long: {e}")))?;

    let tx_in: Vec<TxIn> = inputs
        .iter()
        .map(|input| TxIn {
            previous_output: input.outpoint(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        })
        .collect();

    let tx_out = vec![
        TxOut {
            value: min_non_dust,
            script_pubkey: peer_notification_address.script_pubkey(),
        },
        TxOut {
            value: Amount::ZERO,
            script_pubkey: ScriptBuf::new_op_return(payload),
        },
    ];

    Ok(Transaction {
        version: bitcoin::transaction::Version::TWO,
        lock_time: bitcoin::absolute::LockTime::ZERO,
        input: tx_in,
        output: tx_out,
    })
}

/// Parse an inbound transaction as a notification, given the pubkey that
/// signed its first input and our notification private key.
///
/// Fails with `NoOpReturn` if no 80-byte `OP_RETURN` push is present, or
/// `InvalidUnblindedCode` if the unblinded payload isn't a valid point.
pub fn parse_notification<C: Signing>(
    secp: &Secp256k1<C>,
    tx: &Transaction,
    first_input_pubkey: &PublicKey,
    my_notification_private_key: &SecretKey,
) -> Result<PaymentCode> {
    let raw_payload = extract_op_return_payload(tx)?;
    let candidate = PaymentCode::from_payload(&raw_payload)?;

    let first_input = tx
        .input
        .first()
        .ok_or(NotificationParseError::NoOpReturn)?;

    let shared = shared_secret(secp, my_notification_private_key, first_input_pubkey)?;
    let outpoint = to_crypto_outpoint(first_input.previous_output);
    let mask = blinding_mask(outpoint, &shared)?;

    let unblinded = candidate.unblind(&mask);
    unblinded
        .to_pub_key()
        .map_err(|_| NotificationParseError::InvalidUnblindedCode)?;

    Ok(unblinded)
}

fn extract_op_return_payload(tx: &Transaction) -> Result<[u8; 80]> {
    for output in &tx.output {
        if !output.script_pubkey.is_op_return() {
            continue;
        }
        for instruction in output.script_pubkey.instructions().flatten() {
            if let bitcoin::script::Instruction::PushBytes(bytes) = instruction {
                if bytes.len() == 80 {
                    let mut payload = [0u8; 80];
                    payload.copy_from_slice(bytes.as_bytes());
                    return Ok(payload);
                }
            }
        }
    }
    Err(NotificationParseError::NoOpReturn.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::Txid;

    struct FakeInput {
        outpoint: OutPoint,
        value: Amount,
    }

    impl SpendableInput for FakeInput {
        fn outpoint(&self) -> OutPoint {
            self.outpoint
        }
        fn value(&self) -> Amount {
            self.value
        }
    }

    fn alice_notification_priv() -> SecretKey {
        SecretKey::from_slice(&[0x07; 32]).unwrap()
    }

    #[test]
    fn build_then_parse_round_trips_payment_code() {
        let secp = Secp256k1::new();
        let sender_code = {
            let pubkey = SecretKey::from_slice(&[0x01; 32])
                .unwrap()
                .public_key(&secp);
            PaymentCode::new(&pubkey, [0x02; 32])
        };

        let first_input_priv = SecretKey::from_slice(&[0x03; 32]).unwrap();
        let recipient_notification_priv = alice_notification_priv();
        let recipient_notification_pub = recipient_notification_priv.public_key(&secp);

        let peer_address = {
            let pk = bitcoin::PublicKey::new(recipient_notification_pub);
            Address::p2pkh(pk, bitcoin::Network::Bitcoin)
        };

        let inputs = vec![FakeInput {
            outpoint: OutPoint {
                txid: Txid::from_byte_array([0xAA; 32]),
                vout: 0,
            },
            value: Amount::from_sat(10_000),
        }];

        let tx = build_notification_transaction(
            &secp,
            &inputs,
            &first_input_priv,
            &sender_code,
            &recipient_notification_pub,
            &peer_address,
            Amount::from_sat(546),
        )
        .unwrap();

        let first_input_pub = first_input_priv.public_key(&secp);
        let parsed =
            parse_notification(&secp, &tx, &first_input_pub, &recipient_notification_priv)
                .unwrap();

        assert_eq!(parsed, sender_code);
    }

    #[test]
    fn parse_fails_without_op_return() {
        let secp = Secp256k1::new();
        let tx = Transaction {
            version: bitcoin::transaction::Version::TWO,
            lock_time: bitcoin::absolute::LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: Txid::from_byte_array([0; 32]),
                    vout: 0,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            }],
            output: vec![],
        };
        let priv_key = SecretKey::from_slice(&[0x09; 32]).unwrap();
        let pub_key = priv_key.public_key(&secp);
        let err = parse_notification(&secp, &tx, &pub_key, &priv_key).unwrap_err();
        assert!(matches!(
            err,
            WalletError::NotificationParseError(NotificationParseError::NoOpReturn)
        ));
    }

    #[test]
    fn build_fails_with_no_inputs() {
        let secp = Secp256k1::new();
        let sender_code = {
            let pubkey = SecretKey::from_slice(&[0x01; 32])
                .unwrap()
                .public_key(&secp);
            PaymentCode::new(&pubkey, [0x02; 32])
        };
        let first_input_priv = SecretKey::from_slice(&[0x03; 32]).unwrap();
        let recipient_pub = alice_notification_priv().public_key(&secp);
        let peer_address = Address::p2pkh(
            bitcoin::PublicKey::new(recipient_pub),
            bitcoin::Network::Bitcoin,
        );

        let inputs: Vec<FakeInput> = vec![];
        let err = build_notification_transaction(
            &secp,
            &inputs,
            &first_input_priv,
            &sender_code,
            &recipient_pub,
            &peer_address,
            Amount::from_sat(546),
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientMoney { .. }));
    }
}
