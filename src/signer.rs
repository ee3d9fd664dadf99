//! Transaction signing
//!
//! For every input the signer computes the digest selected by the spent script and the
//! chain, signs it with the matching key (low-S, DER, hash type byte appended) and
//! builds the scriptSig and witness. Any failure aborts the whole transaction.
//!
//! Signing can also be split for keys held elsewhere: [`preimage_hashes`] lists the
//! digests each signature slot needs, and [`compile_with_signatures`] assembles the
//! transaction from signatures produced over those digests, in the same order.

use crate::assembler::build_transaction_for;
use crate::chain::{self, ChainCapability};
use crate::constants::*;
use crate::error::{Result, SigningError};
use crate::hashes::{hash160, ripemd160, sha256};
use crate::keys::KeyStore;
use crate::script::{self, ScriptKind};
use crate::segwit::{self, Witness};
use crate::sighash::SignatureVersion;
use crate::transaction::{encode_transaction, transaction_id};
use crate::types::*;
use secp256k1::{ecdsa::Signature, Message, PublicKey, SecretKey};
use std::cell::RefCell;
use std::collections::HashMap;

/// Sign the transaction described by `plan`
pub fn sign_transaction(request: &SigningRequest, plan: &TransactionPlan) -> Result<SignedTransaction> {
    TransactionSigner::new(request, plan)?.sign()
}

/// Digests to be signed, one per signature slot in input order, without signing anything
pub fn preimage_hashes(request: &SigningRequest, plan: &TransactionPlan) -> Result<Vec<PreimageHash>> {
    let signer = TransactionSigner::with_mode(request, plan, SigningMode::HashOnly)?;
    signer.sign()?;
    Ok(signer.preimages.into_inner())
}

/// Assemble the transaction from signatures over the digests of [`preimage_hashes`]
///
/// Every signature is checked against its digest and the key the slot expects.
pub fn compile_with_signatures(
    request: &SigningRequest,
    plan: &TransactionPlan,
    signatures: &[ExternalSignature],
) -> Result<SignedTransaction> {
    let signer = TransactionSigner::with_mode(request, plan, SigningMode::External(signatures))?;
    let signed = signer.sign()?;
    let needed = signer.preimages.borrow().len();
    if needed != signatures.len() {
        return Err(SigningError::SignatureFailure(format!(
            "{} signatures supplied, {} needed",
            signatures.len(),
            needed
        )));
    }
    Ok(signed)
}

/// Whether `script` can be spent with `keys`, resolving P2SH and P2WSH through `scripts`
pub fn can_spend(script: &Script, keys: &KeyStore, scripts: &HashMap<String, Script>) -> bool {
    match script::classify(script.as_bytes()) {
        ScriptKind::PayToScriptHash(hash) => match scripts.get(&hex::encode(hash)) {
            Some(redeem) => match script::classify(redeem.as_bytes()) {
                ScriptKind::PayToScriptHash(_) => false,
                ScriptKind::PayToWitnessScriptHash(program) => witness_script(&program, scripts)
                    .map_or(false, |ws| can_spend_terminal(ws, keys)),
                _ => can_spend_terminal(redeem, keys),
            },
            None => false,
        },
        ScriptKind::PayToWitnessScriptHash(program) => {
            witness_script(&program, scripts).map_or(false, |ws| can_spend_terminal(ws, keys))
        }
        _ => can_spend_terminal(script, keys),
    }
}

fn can_spend_terminal(script: &Script, keys: &KeyStore) -> bool {
    match script::classify(script.as_bytes()) {
        ScriptKind::PayToPublicKey(pubkey) => keys.find_by_public_key(&pubkey).is_some(),
        ScriptKind::PayToPublicKeyHash(hash) | ScriptKind::PayToWitnessPublicKeyHash(hash) => {
            keys.find_by_hash(&hash).is_some()
        }
        ScriptKind::Multisig { required, keys: pubkeys } => {
            pubkeys.iter().filter(|pk| keys.find_by_public_key(pk).is_some()).count() >= required
        }
        _ => false,
    }
}

fn witness_script<'a>(program: &[u8; 32], scripts: &'a HashMap<String, Script>) -> Option<&'a Script> {
    scripts.get(&hex::encode(ripemd160(program)))
}

/// Where signatures come from
#[derive(Debug, Clone, Copy)]
enum SigningMode<'a> {
    /// The request's private keys
    Normal,
    /// Nowhere: digests are recorded and placeholders fill the unlocking data
    HashOnly,
    /// Supplied by the caller, consumed in digest order
    External(&'a [ExternalSignature]),
}

impl SigningMode<'_> {
    fn label(&self) -> &'static str {
        match self {
            SigningMode::Normal => "signed",
            SigningMode::HashOnly => "hashed",
            SigningMode::External(_) => "compiled",
        }
    }
}

pub struct TransactionSigner<'a> {
    request: &'a SigningRequest,
    plan: &'a TransactionPlan,
    chain: Box<dyn ChainCapability>,
    keys: KeyStore,
    hash_type: u32,
    mode: SigningMode<'a>,
    preimages: RefCell<Vec<PreimageHash>>,
}

impl<'a> TransactionSigner<'a> {
    pub fn new(request: &'a SigningRequest, plan: &'a TransactionPlan) -> Result<Self> {
        Self::with_mode(request, plan, SigningMode::Normal)
    }

    fn with_mode(request: &'a SigningRequest, plan: &'a TransactionPlan, mode: SigningMode<'a>) -> Result<Self> {
        let chain = chain::capability(request.chain);
        let hash_type = request.hash_type.unwrap_or(chain.params().default_hash_type);
        let keys = KeyStore::new(&request.private_keys)?;
        Ok(TransactionSigner { request, plan, chain, keys, hash_type, mode, preimages: RefCell::new(Vec::new()) })
    }

    /// Reject plans that cannot be signed as given
    fn validate_plan(&self) -> Result<()> {
        let plan = self.plan;
        if let Some(error) = &plan.error {
            return Err(error.clone());
        }
        if plan.utxos.is_empty() {
            return Err(SigningError::EmptyOrInconsistentPlan("plan selects no UTXOs".to_string()));
        }
        if plan.fee <= 0 {
            return Err(SigningError::EmptyOrInconsistentPlan("plan has no fee".to_string()));
        }
        if plan.amount < 0 || plan.change < 0 {
            return Err(SigningError::EmptyOrInconsistentPlan(
                "plan has a negative amount or change".to_string(),
            ));
        }
        if let Some(unknown) = plan.utxos.iter().find(|u| !self.request.utxos.contains(u)) {
            return Err(SigningError::EmptyOrInconsistentPlan(format!(
                "plan spends {}:{} which is not among the supplied UTXOs",
                hex::encode(unknown.out_point.hash),
                unknown.out_point.index
            )));
        }

        let inputs = plan.selected_total();
        let planned = plan.amount.saturating_add(plan.fee).saturating_add(plan.change);
        if inputs != planned {
            return Err(SigningError::AmountMismatch { inputs, planned });
        }
        Ok(())
    }

    pub fn sign(&self) -> Result<SignedTransaction> {
        self.validate_plan()?;
        let unsigned = build_transaction_for(self.chain.as_ref(), self.request, self.plan)?;

        let mut signed = unsigned.clone();
        for (index, utxo) in self.plan.utxos.iter().enumerate() {
            let (script_sig, witness) = self.sign_input(&unsigned, index, utxo)?;
            log::debug!(
                "signed input {} ({} byte scriptSig, {} witness items)",
                index,
                script_sig.len(),
                witness.len()
            );
            signed.inputs[index].script_sig = script_sig;
            signed.inputs[index].witness = witness;
        }

        let chain = self.chain.as_ref();
        let encoded = encode_transaction(&signed, chain, true);
        let txid = transaction_id(&signed, chain);
        let weight = segwit::calculate_transaction_weight(&signed, chain);
        let vsize = segwit::calculate_virtual_size(weight);
        log::info!(
            "{} {:?} transaction with {} inputs, {} outputs, vsize {}",
            self.mode.label(),
            self.request.chain,
            signed.inputs.len(),
            signed.outputs.len(),
            vsize
        );

        Ok(SignedTransaction { transaction: signed, encoded, txid, weight, vsize })
    }

    fn sign_input(&self, tx: &Transaction, index: usize, utxo: &UnspentOutput) -> Result<(Script, Witness)> {
        // the witness digests would commit to a zero hash here; refuse for every digest type
        if self.hash_type & SIGHASH_BASE_MASK == SIGHASH_SINGLE && index >= tx.outputs.len() {
            return Err(SigningError::SignatureFailure(format!(
                "input {} has no corresponding output for SIGHASH_SINGLE",
                index
            )));
        }

        let amount = utxo.amount;
        match script::classify(utxo.script.as_bytes()) {
            ScriptKind::PayToScriptHash(hash) => {
                let redeem = self.redeem_script(&hash)?;
                let redeem_push = script::push_all(&[redeem.as_bytes()]);
                match script::classify(redeem.as_bytes()) {
                    ScriptKind::PayToWitnessPublicKeyHash(key_hash) => {
                        Ok((redeem_push, self.sign_witness_key_hash(tx, index, &key_hash, amount)?))
                    }
                    ScriptKind::PayToWitnessScriptHash(program) => {
                        Ok((redeem_push, self.sign_witness_script(tx, index, &program, amount)?))
                    }
                    _ => {
                        let mut items = self.sign_terminal(tx, index, redeem, amount, SignatureVersion::Base)?;
                        items.push(redeem.as_bytes().to_vec());
                        Ok((push_items(&items), Vec::new()))
                    }
                }
            }
            ScriptKind::PayToWitnessPublicKeyHash(key_hash) => {
                Ok((Script::default(), self.sign_witness_key_hash(tx, index, &key_hash, amount)?))
            }
            ScriptKind::PayToWitnessScriptHash(program) => {
                Ok((Script::default(), self.sign_witness_script(tx, index, &program, amount)?))
            }
            _ => {
                let items = self.sign_terminal(tx, index, &utxo.script, amount, SignatureVersion::Base)?;
                Ok((push_items(&items), Vec::new()))
            }
        }
    }

    fn redeem_script(&self, hash: &[u8; 20]) -> Result<&'a Script> {
        self.request
            .scripts
            .get(&hex::encode(hash))
            .ok_or_else(|| SigningError::MissingRedeemScript(hex::encode(hash)))
    }

    /// Signature stack for a P2PK, P2PKH or multisig script used as its own script code
    fn sign_terminal(
        &self,
        tx: &Transaction,
        index: usize,
        script_code: &Script,
        amount: Amount,
        version: SignatureVersion,
    ) -> Result<Vec<Vec<u8>>> {
        let slot = SignatureSlot { tx, index, script_code, amount, version };
        match script::classify(script_code.as_bytes()) {
            ScriptKind::PayToPublicKey(pubkey) => {
                let key = self.keys.find_by_public_key(&pubkey).map(|secret| (secret, pubkey.clone()));
                let (signature, _) = self.signature_for(&slot, &hash160(&pubkey), key)?;
                Ok(vec![signature])
            }
            ScriptKind::PayToPublicKeyHash(hash) => {
                let (signature, pubkey) = self.signature_for(&slot, &hash, self.keys.find_by_hash(&hash))?;
                Ok(vec![signature, pubkey])
            }
            ScriptKind::Multisig { required, keys } => {
                // CHECKMULTISIG pops one extra item
                let mut items = vec![Vec::new()];
                for pubkey in &keys {
                    if items.len() > required {
                        break;
                    }
                    let key = self.keys.find_by_public_key(pubkey).map(|secret| (secret, pubkey.clone()));
                    if key.is_none() && matches!(self.mode, SigningMode::Normal) {
                        continue;
                    }
                    let (signature, _) = self.signature_for(&slot, &hash160(pubkey), key)?;
                    items.push(signature);
                }
                if items.len() <= required {
                    return Err(SigningError::MissingPrivateKey(format!(
                        "input {}: {} of {} multisig keys available",
                        index,
                        items.len() - 1,
                        required
                    )));
                }
                Ok(items)
            }
            other => Err(SigningError::UnsupportedScript(format!(
                "input {}: cannot sign {:?} ({})",
                index,
                other,
                script_code.to_hex()
            ))),
        }
    }

    fn ensure_witness_support(&self, index: usize) -> Result<()> {
        if self.chain.supports_witness() {
            Ok(())
        } else {
            Err(SigningError::UnsupportedScript(format!(
                "input {}: {:?} has no witness support",
                index, self.request.chain
            )))
        }
    }

    /// Witness [signature, pubkey] for a P2WPKH program
    fn sign_witness_key_hash(&self, tx: &Transaction, index: usize, hash: &[u8; 20], amount: Amount) -> Result<Witness> {
        self.ensure_witness_support(index)?;
        let script_code = script::pay_to_public_key_hash(hash);
        let slot = SignatureSlot { tx, index, script_code: &script_code, amount, version: SignatureVersion::WitnessV0 };
        let (signature, pubkey) = self.signature_for(&slot, hash, self.keys.find_by_hash(hash))?;
        Ok(vec![signature, pubkey])
    }

    /// Witness [signatures..., witness script] for a P2WSH program
    fn sign_witness_script(&self, tx: &Transaction, index: usize, program: &[u8; 32], amount: Amount) -> Result<Witness> {
        self.ensure_witness_support(index)?;
        let ws = witness_script(program, &self.request.scripts)
            .ok_or_else(|| SigningError::MissingRedeemScript(hex::encode(ripemd160(program))))?;
        if sha256(ws.as_bytes()) != *program {
            return Err(SigningError::MissingRedeemScript(format!(
                "witness script {} does not hash to the spent program",
                ws.to_hex()
            )));
        }
        let mut items = self.sign_terminal(tx, index, ws, amount, SignatureVersion::WitnessV0)?;
        items.push(ws.as_bytes().to_vec());
        Ok(items)
    }

    /// Signature and public key for the slot's key, which hashes to `key_hash`
    ///
    /// `key` is the matching local key, if any; only normal signing requires it.
    fn signature_for(
        &self,
        slot: &SignatureSlot<'_>,
        key_hash: &[u8; 20],
        key: Option<(&SecretKey, Vec<u8>)>,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        if let SigningMode::Normal = self.mode {
            let (secret, pubkey) = key.ok_or_else(|| missing_key(slot.index, key_hash))?;
            return Ok((self.create_signature(slot, secret)?, pubkey));
        }

        let digest = self.digest(slot)?;
        let position = {
            let mut preimages = self.preimages.borrow_mut();
            preimages.push(PreimageHash { input_index: slot.index, digest, key_hash: *key_hash });
            preimages.len() - 1
        };
        match self.mode {
            SigningMode::External(signatures) => {
                let supplied = signatures.get(position).ok_or_else(|| {
                    SigningError::SignatureFailure(format!(
                        "input {}: no external signature for slot {}",
                        slot.index, position
                    ))
                })?;
                let mut signature = self.verify_external(slot.index, supplied, &digest, key_hash)?;
                signature.push(self.hash_type_byte());
                Ok((signature, supplied.public_key.clone()))
            }
            _ => {
                let pubkey = key.map_or_else(|| vec![0u8; PUBLIC_KEY_SIZE], |(_, pubkey)| pubkey);
                Ok((vec![0u8; SIGNATURE_SIZE], pubkey))
            }
        }
    }

    fn digest(&self, slot: &SignatureSlot<'_>) -> Result<Hash> {
        self.chain
            .signature_hash(slot.tx, slot.index, slot.script_code, slot.amount, self.hash_type, slot.version)
    }

    fn hash_type_byte(&self) -> u8 {
        (self.hash_type & 0xff) as u8
    }

    fn create_signature(&self, slot: &SignatureSlot<'_>, secret: &SecretKey) -> Result<Vec<u8>> {
        let digest = self.digest(slot)?;
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| SigningError::SignatureFailure(format!("input {}: {}", slot.index, e)))?;
        let mut signature = self.keys.secp().sign_ecdsa(&message, secret);
        signature.normalize_s();

        let mut encoded = signature.serialize_der().to_vec();
        encoded.push(self.hash_type_byte());
        Ok(encoded)
    }

    /// Low-S DER form of a supplied signature that verifies over `digest` with the expected key
    fn verify_external(
        &self,
        index: usize,
        supplied: &ExternalSignature,
        digest: &Hash,
        key_hash: &[u8; 20],
    ) -> Result<Vec<u8>> {
        let failure = |reason: String| SigningError::SignatureFailure(format!("input {}: {}", index, reason));
        if hash160(&supplied.public_key) != *key_hash {
            return Err(failure(format!(
                "public key {} does not hash to {}",
                hex::encode(&supplied.public_key),
                hex::encode(key_hash)
            )));
        }
        let public_key = PublicKey::from_slice(&supplied.public_key).map_err(|e| failure(e.to_string()))?;
        let mut signature = Signature::from_der(&supplied.signature).map_err(|e| failure(e.to_string()))?;
        signature.normalize_s();
        let message = Message::from_digest_slice(digest).map_err(|e| failure(e.to_string()))?;
        self.keys
            .secp()
            .verify_ecdsa(&message, &signature, &public_key)
            .map_err(|_| failure("signature does not verify against the digest".to_string()))?;
        Ok(signature.serialize_der().to_vec())
    }
}

/// What one signature commits to
struct SignatureSlot<'t> {
    tx: &'t Transaction,
    index: usize,
    script_code: &'t Script,
    amount: Amount,
    version: SignatureVersion,
}

fn push_items(items: &[Vec<u8>]) -> Script {
    let refs: Vec<&[u8]> = items.iter().map(Vec::as_slice).collect();
    script::push_all(&refs)
}

fn missing_key(index: usize, key_id: &[u8]) -> SigningError {
    SigningError::MissingPrivateKey(format!("input {}: no key for {}", index, hex::encode(key_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;
    use crate::hashes::hash160;
    use secp256k1::{ecdsa::Signature, PublicKey, Secp256k1};

    const KEY: &str = "bbc27228ddcb9209d7fd6f36b02f7dfa6252af40bb2f1cbc7a557da8027ff866";
    const KEY_HASH: &str = "b7cd046b6d522a3d61dbcb5235c0e9cc97265457";
    const TO: &str = "1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx";
    const CHANGE: &str = "1FQc5LdgGHMHEN9nwkjmz6tWkxhPpxBvBU";

    fn key_hash() -> [u8; 20] {
        let mut out = [0u8; 20];
        hex::decode_to_slice(KEY_HASH, &mut out).unwrap();
        out
    }

    fn create_test_request(scripts: Vec<Script>) -> SigningRequest {
        let utxos = scripts
            .into_iter()
            .enumerate()
            .map(|(i, script)| UnspentOutput {
                out_point: OutPoint::new([i as u8 + 1; 32], 0),
                amount: 100_000,
                script,
            })
            .collect();
        SigningRequest {
            chain: ChainId::Bitcoin,
            private_keys: vec![PrivateKey::from_hex(KEY).unwrap()],
            utxos,
            to_address: TO.to_string(),
            change_address: CHANGE.to_string(),
            ..Default::default()
        }
    }

    fn plan_all(request: &SigningRequest) -> TransactionPlan {
        let total: Amount = request.utxos.iter().map(|u| u.amount).sum();
        TransactionPlan {
            utxos: request.utxos.clone(),
            available_amount: total,
            amount: total - 10_000 - 5_000,
            fee: 10_000,
            change: 5_000,
            error: None,
        }
    }

    fn verify_signature(signed: &SignedTransaction, pubkey: &[u8], signature: &[u8], digest: Hash) {
        let secp = Secp256k1::verification_only();
        let pubkey = PublicKey::from_slice(pubkey).unwrap();
        let sig = Signature::from_der(&signature[..signature.len() - 1]).unwrap();
        let message = Message::from_digest_slice(&digest).unwrap();
        secp.verify_ecdsa(&message, &sig, &pubkey).unwrap();
        assert!(!signed.encoded.is_empty());
    }

    #[test]
    fn test_sign_p2pkh_signature_verifies() {
        let request = create_test_request(vec![script::pay_to_public_key_hash(&key_hash())]);
        let plan = plan_all(&request);
        let signed = sign_transaction(&request, &plan).unwrap();

        let script_sig = signed.transaction.inputs[0].script_sig.as_bytes();
        let sig_len = script_sig[0] as usize;
        let signature = &script_sig[1..1 + sig_len];
        let pubkey = &script_sig[2 + sig_len..];
        assert_eq!(*signature.last().unwrap(), SIGHASH_ALL as u8);

        let chain = chain::capability(ChainId::Bitcoin);
        let unsigned = build_transaction_for(chain.as_ref(), &request, &plan).unwrap();
        let digest = chain
            .signature_hash(&unsigned, 0, &request.utxos[0].script, 100_000, SIGHASH_ALL, SignatureVersion::Base)
            .unwrap();
        verify_signature(&signed, pubkey, signature, digest);
    }

    #[test]
    fn test_sign_p2wpkh_puts_signature_in_witness() {
        let request = create_test_request(vec![script::pay_to_witness_public_key_hash(&key_hash())]);
        let signed = sign_transaction(&request, &plan_all(&request)).unwrap();
        let input = &signed.transaction.inputs[0];
        assert!(input.script_sig.is_empty());
        assert_eq!(input.witness.len(), 2);
        assert_eq!(input.witness[1].len(), 33);
        // marker and flag
        assert_eq!(&signed.encoded[4..6], &[0x00, 0x01]);
        assert!(signed.weight < 4 * signed.encoded.len() as u64);
    }

    #[test]
    fn test_sign_nested_p2wpkh() {
        let redeem = script::pay_to_witness_public_key_hash(&key_hash());
        let lock = script::pay_to_script_hash(&hash160(redeem.as_bytes()));
        let mut request = create_test_request(vec![lock]);
        request.scripts.insert(script::script_key(&redeem), redeem.clone());

        let signed = sign_transaction(&request, &plan_all(&request)).unwrap();
        let input = &signed.transaction.inputs[0];
        assert_eq!(input.script_sig.to_hex(), format!("16{}", redeem.to_hex()));
        assert_eq!(input.witness.len(), 2);
    }

    #[test]
    fn test_sign_p2wsh_multisig() {
        let secp = Secp256k1::new();
        let second = PrivateKey([0x42; 32]);
        let pk1 = PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&PrivateKey::from_hex(KEY).unwrap().0).unwrap());
        let pk2 = PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&second.0).unwrap());

        let mut ws = vec![OP_1 + 1];
        script::push_data(&mut ws, &pk1.serialize());
        script::push_data(&mut ws, &pk2.serialize());
        ws.extend_from_slice(&[OP_1 + 1, OP_CHECKMULTISIG]);
        let ws = Script::new(ws);
        let lock = script::pay_to_witness_script_hash(&sha256(ws.as_bytes()));

        let mut request = create_test_request(vec![lock]);
        request.private_keys.push(second);
        request.scripts.insert(script::script_key(&ws), ws.clone());

        let signed = sign_transaction(&request, &plan_all(&request)).unwrap();
        let witness = &signed.transaction.inputs[0].witness;
        assert_eq!(witness.len(), 4);
        assert!(witness[0].is_empty());
        assert_eq!(witness[3], ws.as_bytes().to_vec());
    }

    #[test]
    fn test_multisig_with_too_few_keys() {
        let mut ws = vec![OP_1 + 1];
        script::push_data(&mut ws, &[0x02; 33]);
        script::push_data(&mut ws, &[0x03; 33]);
        ws.extend_from_slice(&[OP_1 + 1, OP_CHECKMULTISIG]);
        let ws = Script::new(ws);
        let lock = script::pay_to_witness_script_hash(&sha256(ws.as_bytes()));
        let mut request = create_test_request(vec![lock]);
        request.scripts.insert(script::script_key(&ws), ws);

        let err = sign_transaction(&request, &plan_all(&request)).unwrap_err();
        assert!(matches!(err, SigningError::MissingPrivateKey(_)));
    }

    #[test]
    fn test_preimage_hashes_for_multisig_without_keys() {
        let mut ws = vec![OP_1 + 1];
        script::push_data(&mut ws, &[0x02; 33]);
        script::push_data(&mut ws, &[0x03; 33]);
        ws.extend_from_slice(&[OP_1 + 1, OP_CHECKMULTISIG]);
        let ws = Script::new(ws);
        let lock = script::pay_to_witness_script_hash(&sha256(ws.as_bytes()));
        let mut request = create_test_request(vec![lock, script::pay_to_public_key_hash(&key_hash())]);
        request.private_keys.clear();
        request.scripts.insert(script::script_key(&ws), ws);
        let plan = plan_all(&request);

        let slots = preimage_hashes(&request, &plan).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].key_hash, hash160(&[0x02; 33]));
        assert_eq!(slots[1].key_hash, hash160(&[0x03; 33]));
        assert_eq!(slots[0].digest, slots[1].digest);
        assert_eq!((slots[2].input_index, slots[2].key_hash), (1, key_hash()));

        // hashing never touches signatures, so the digests match those of normal signing
        let chain = chain::capability(ChainId::Bitcoin);
        let unsigned = build_transaction_for(chain.as_ref(), &request, &plan).unwrap();
        let digest = chain
            .signature_hash(&unsigned, 1, &request.utxos[1].script, 100_000, SIGHASH_ALL, SignatureVersion::Base)
            .unwrap();
        assert_eq!(slots[2].digest, digest);

        let bogus = vec![ExternalSignature { signature: vec![0x30, 0x00], public_key: vec![0x02; 33] }; 3];
        let err = compile_with_signatures(&request, &plan, &bogus).unwrap_err();
        assert!(matches!(err, SigningError::SignatureFailure(_)));
    }

    #[test]
    fn test_missing_redeem_script() {
        let lock = script::pay_to_script_hash(&[0x99; 20]);
        let request = create_test_request(vec![lock]);
        let err = sign_transaction(&request, &plan_all(&request)).unwrap_err();
        assert!(matches!(err, SigningError::MissingRedeemScript(_)));
    }

    #[test]
    fn test_missing_key_fails_atomically() {
        let request = create_test_request(vec![
            script::pay_to_public_key_hash(&key_hash()),
            script::pay_to_public_key_hash(&[0x77; 20]),
        ]);
        let err = sign_transaction(&request, &plan_all(&request)).unwrap_err();
        assert!(matches!(err, SigningError::MissingPrivateKey(_)));
    }

    #[test]
    fn test_tampered_fee_is_rejected() {
        let request = create_test_request(vec![script::pay_to_public_key_hash(&key_hash())]);
        let mut plan = plan_all(&request);
        plan.fee += 1;
        let err = sign_transaction(&request, &plan).unwrap_err();
        assert_eq!(err, SigningError::AmountMismatch { inputs: 100_000, planned: 100_001 });
    }

    #[test]
    fn test_empty_and_zero_fee_plans_rejected() {
        let request = create_test_request(vec![script::pay_to_public_key_hash(&key_hash())]);
        let empty = TransactionPlan::default();
        assert!(matches!(
            sign_transaction(&request, &empty),
            Err(SigningError::EmptyOrInconsistentPlan(_))
        ));

        let mut zero_fee = plan_all(&request);
        zero_fee.change += zero_fee.fee;
        zero_fee.fee = 0;
        assert!(matches!(
            sign_transaction(&request, &zero_fee),
            Err(SigningError::EmptyOrInconsistentPlan(_))
        ));
    }

    #[test]
    fn test_plan_utxo_not_in_request() {
        let request = create_test_request(vec![script::pay_to_public_key_hash(&key_hash())]);
        let mut plan = plan_all(&request);
        plan.utxos[0].amount += 1;
        plan.change += 1;
        assert!(matches!(
            sign_transaction(&request, &plan),
            Err(SigningError::EmptyOrInconsistentPlan(_))
        ));
    }

    #[test]
    fn test_plan_error_is_returned() {
        let request = create_test_request(vec![]);
        let plan = TransactionPlan::failed(SigningError::InvalidAddress("x".to_string()));
        assert_eq!(sign_transaction(&request, &plan).unwrap_err(), SigningError::InvalidAddress("x".to_string()));
    }

    #[test]
    fn test_single_without_matching_output() {
        let mut request = create_test_request(vec![
            script::pay_to_public_key_hash(&key_hash()),
            script::pay_to_public_key_hash(&key_hash()),
        ]);
        request.hash_type = Some(SIGHASH_SINGLE);
        let mut plan = plan_all(&request);
        plan.amount += plan.change;
        plan.change = 0;
        let err = sign_transaction(&request, &plan).unwrap_err();
        assert!(matches!(err, SigningError::SignatureFailure(_)));
    }

    #[test]
    fn test_signatures_are_low_s() {
        let request = create_test_request(vec![script::pay_to_witness_public_key_hash(&key_hash())]);
        let signed = sign_transaction(&request, &plan_all(&request)).unwrap();
        let der = &signed.transaction.inputs[0].witness[0];
        let mut sig = Signature::from_der(&der[..der.len() - 1]).unwrap();
        let original = sig;
        sig.normalize_s();
        assert_eq!(sig, original);
    }

    #[test]
    fn test_zcash_rejects_witness_inputs() {
        let mut request = create_test_request(vec![script::pay_to_witness_public_key_hash(&key_hash())]);
        request.chain = ChainId::Zcash;
        request.to_address = "t1QahNjDdibyE4EdYkawUSKBBcVTSqv64CS".to_string();
        let mut plan = plan_all(&request);
        plan.amount += plan.change;
        plan.change = 0;
        let err = sign_transaction(&request, &plan).unwrap_err();
        assert!(matches!(err, SigningError::UnsupportedScript(_)));
    }

    #[test]
    fn test_can_spend() {
        let keys = KeyStore::new(&[PrivateKey::from_hex(KEY).unwrap()]).unwrap();
        let scripts = HashMap::new();
        assert!(can_spend(&script::pay_to_public_key_hash(&key_hash()), &keys, &scripts));
        assert!(can_spend(&script::pay_to_witness_public_key_hash(&key_hash()), &keys, &scripts));
        assert!(!can_spend(&script::pay_to_public_key_hash(&[0; 20]), &keys, &scripts));
        assert!(!can_spend(&script::pay_to_script_hash(&[0; 20]), &keys, &scripts));
        assert!(!can_spend(&script::op_return(b"x"), &keys, &scripts));
    }
}
