//! Per-chain behaviour: registry, addresses, layouts and digests

use utxo_signer::chain::{self, ChainCapability};
use utxo_signer::transaction::encode_transaction;
use utxo_signer::*;

#[test]
fn test_registry_defaults() {
    // whether or not another test initialised it first, empty overrides keep the defaults
    chain::init_registry(Vec::new());
    assert_eq!(chain::chain_params(ChainId::Dogecoin).dust_threshold, 1_000_000);
    assert_eq!(chain::chain_params(ChainId::Bitcoin).dust_threshold, 546);
    assert_eq!(chain::chain_params(ChainId::BitcoinCash).default_hash_type, 0x41);
    assert_eq!(chain::chain_params(ChainId::BitcoinGold).default_hash_type, 0x4f41);
    assert_eq!(chain::chain_params(ChainId::Zcash).version, 4);
}

#[test]
fn test_lock_scripts_for_addresses() {
    let signer = UtxoSigner::new();
    let cases = [
        (ChainId::Bitcoin, "1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx", "76a914769bdff96a02f9135a1d19b749db6a78fe07dc9088ac"),
        (
            ChainId::Bitcoin,
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            "0014751e76e8199196d454941c45d1b3a323f1433bd6",
        ),
        (ChainId::Zcash, "t1QahNjDdibyE4EdYkawUSKBBcVTSqv64CS", "76a91449964a736f3713d64283fd0018626ba50091c7e988ac"),
        (
            ChainId::Groestlcoin,
            "31inaRqambLsd9D7Ke4USZmGEVd3PHkh7P",
            "a9140055b0c94df477ee6b9f75185dfc9aa8ce2e52e487",
        ),
        (
            ChainId::Groestlcoin,
            "grs1qw4teyraux2s77nhjdwh9ar8rl9dt7zww8r6lne",
            "00147557920fbc32a1ef4ef26bae5e8ce3f95abf09ce",
        ),
    ];
    for (chain, address, expected) in cases {
        let script = signer.lock_script_for_address(address, chain).unwrap();
        assert_eq!(script.to_hex(), expected, "{:?} {}", chain, address);
    }
}

#[test]
fn test_lock_script_rejects_wrong_network() {
    let signer = UtxoSigner::new();
    let err = signer
        .lock_script_for_address("1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx", ChainId::Zcash)
        .unwrap_err();
    assert!(matches!(err, SigningError::InvalidAddress(_)));
    assert!(!signer.is_valid_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", ChainId::Litecoin));
}

#[test]
fn test_replay_protected_lock_script() {
    let address = p2pkh_address(ChainId::Zen, [0x44; 20]);
    let anchor = ReplayAnchor { block_hash: [0xab; 32], block_height: 500_000 };

    let signer = UtxoSigner::new();
    let plain = signer.lock_script_for_address(&address, ChainId::Zen).unwrap();
    assert_eq!(plain.to_hex(), format!("76a914{}88ac", "44".repeat(20)));

    let protected = signer.lock_script_with_anchor(&address, ChainId::Zen, &anchor).unwrap();
    assert_eq!(
        protected.to_hex(),
        format!("76a914{}88ac20{}0320a107b4", "44".repeat(20), "ab".repeat(32))
    );
    assert_eq!(script::match_pay_to_public_key_hash(protected.as_bytes()), Some([0x44; 20]));

    // other chains ignore the anchor
    let bitcoin = signer
        .lock_script_with_anchor("1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx", ChainId::Bitcoin, &anchor)
        .unwrap();
    assert_eq!(bitcoin.len(), 25);
}

#[test]
fn test_zen_signs_replay_protected_input() {
    let key = PrivateKey::from_hex("bbc27228ddcb9209d7fd6f36b02f7dfa6252af40bb2f1cbc7a557da8027ff866").unwrap();
    let mut hash = [0u8; 20];
    hex::decode_to_slice("b7cd046b6d522a3d61dbcb5235c0e9cc97265457", &mut hash).unwrap();
    let anchor = ReplayAnchor { block_hash: [0x01; 32], block_height: 1_000 };
    let spent = script::with_replay_protection(&script::pay_to_public_key_hash(&hash), &anchor);

    let request = SigningRequest {
        chain: ChainId::Zen,
        private_keys: vec![key],
        utxos: vec![UnspentOutput { out_point: OutPoint::new([3; 32], 0), amount: 1_000_000, script: spent }],
        to_address: p2pkh_address(ChainId::Zen, [0x55; 20]),
        change_address: p2pkh_address(ChainId::Zen, hash),
        amount: 400_000,
        byte_fee: 10,
        replay_anchor: Some(anchor),
        ..Default::default()
    };

    let signed = UtxoSigner::new().plan_and_sign(&request).unwrap();
    assert!(signed.transaction.outputs.iter().all(|o| *o.script_pubkey.as_bytes().last().unwrap() == OP_CHECKBLOCKATHEIGHT));
    // signature push followed by the compressed key push
    let script_sig = signed.transaction.inputs[0].script_sig.as_bytes();
    assert_eq!(script_sig.len(), 1 + script_sig[0] as usize + 34);
}

#[test]
fn test_timestamped_chain_layout() {
    let request = SigningRequest {
        chain: ChainId::Verge,
        to_address: p2pkh_address(ChainId::Verge, [0x10; 20]),
        change_address: p2pkh_address(ChainId::Verge, [0x20; 20]),
        time: Some(1_584_059_579),
        ..Default::default()
    };
    let plan = TransactionPlan {
        utxos: vec![UnspentOutput {
            out_point: OutPoint::new([9; 32], 1),
            amount: 10_000,
            script: script::pay_to_public_key_hash(&[0x30; 20]),
        }],
        available_amount: 10_000,
        amount: 6_000,
        fee: 1_000,
        change: 3_000,
        error: None,
    };

    let tx = assembler::build_transaction(&request, &plan).unwrap();
    let capability = chain::capability(ChainId::Verge);
    let encoded = encode_transaction(&tx, capability.as_ref(), true);
    assert_eq!(&encoded[0..4], &1u32.to_le_bytes());
    assert_eq!(&encoded[4..8], &1_584_059_579u32.to_le_bytes());
    assert_eq!(encoded[8], 1);
    assert_eq!(capability.extras_size(), 4);
}

#[test]
fn test_zcash_sapling_encoding() {
    let capability = chain::capability(ChainId::Zcash);
    let mut hash = [0u8; 32];
    hex::decode_to_slice("a8c685478265f4c14dada651969c45a65e1aeb8cd6791f2f5bb6a1d9952104d9", &mut hash).unwrap();
    let tx = Transaction {
        version: 4,
        inputs: vec![TransactionInput {
            prevout: OutPoint { hash, index: 1, sequence: 0xfffffffe },
            script_sig: Script::from_hex(concat!(
                "483045022100a61e5d557568c2ddc1d9b03a7173c6ce7c996c4daecab007ac8f34bee01e6b97",
                "02204d38fdc0bcf2728a69fde78462a10fb45a9baa27873e6a5fc45fb5c76764202a01",
                "210365ffea3efa3908918a8b8627724af852fc9b86d7375b103ab0543cf418bcaa7f",
            ))
            .unwrap(),
            witness: Vec::new(),
        }],
        outputs: vec![
            TransactionOutput {
                value: 0x02625a00,
                script_pubkey: Script::from_hex("76a9148132712c3ff19f3a151234616777420a6d7ef22688ac").unwrap(),
            },
            TransactionOutput {
                value: 0x0098958b,
                script_pubkey: Script::from_hex("76a9145453e4698f02a38abdaa521cd1ff2dee6fac187188ac").unwrap(),
            },
        ],
        lock_time: 0x0004b029,
        extras: ChainExtras::Zcash {
            version_group_id: ZCASH_SAPLING_VERSION_GROUP_ID,
            expiry_height: 0x0004b048,
            branch_id: ZCASH_SAPLING_BRANCH_ID,
        },
    };

    assert_eq!(
        hex::encode(encode_transaction(&tx, capability.as_ref(), true)),
        concat!(
            "04000080",
            "85202f89",
            "01",
            "a8c685478265f4c14dada651969c45a65e1aeb8cd6791f2f5bb6a1d9952104d9",
            "01000000",
            "6b483045022100a61e5d557568c2ddc1d9b03a7173c6ce7c996c4daecab007ac8f34bee01e6b97",
            "02204d38fdc0bcf2728a69fde78462a10fb45a9baa27873e6a5fc45fb5c76764202a01",
            "210365ffea3efa3908918a8b8627724af852fc9b86d7375b103ab0543cf418bcaa7f",
            "feffffff",
            "02",
            "005a620200000000",
            "1976a9148132712c3ff19f3a151234616777420a6d7ef22688ac",
            "8b95980000000000",
            "1976a9145453e4698f02a38abdaa521cd1ff2dee6fac187188ac",
            "29b00400",
            "48b00400",
            "0000000000000000",
            "00",
            "00",
            "00",
        )
    );
}

#[test]
fn test_bitcoin_gold_signature_carries_fork_id() {
    let key = PrivateKey::from_hex("bbc27228ddcb9209d7fd6f36b02f7dfa6252af40bb2f1cbc7a557da8027ff866").unwrap();
    let mut hash = [0u8; 20];
    hex::decode_to_slice("b7cd046b6d522a3d61dbcb5235c0e9cc97265457", &mut hash).unwrap();
    let request = SigningRequest {
        chain: ChainId::BitcoinGold,
        private_keys: vec![key],
        utxos: vec![UnspentOutput {
            out_point: OutPoint::new([4; 32], 0),
            amount: 1_000_000,
            script: script::pay_to_public_key_hash(&hash),
        }],
        to_address: p2pkh_address(ChainId::BitcoinGold, [0x66; 20]),
        change_address: p2pkh_address(ChainId::BitcoinGold, hash),
        amount: 500_000,
        byte_fee: 5,
        ..Default::default()
    };

    let plan = planner::plan(&request);
    let signed = signer::sign_transaction(&request, &plan).unwrap();
    let script_sig = signed.transaction.inputs[0].script_sig.as_bytes();
    let sig_len = script_sig[0] as usize;
    assert_eq!(script_sig[sig_len], 0x41);

    // the digest is the witness v0 one even for a legacy output
    let unsigned = assembler::build_transaction(&request, &plan).unwrap();
    let capability = chain::capability(ChainId::BitcoinGold);
    let forked = capability
        .signature_hash(&unsigned, 0, &request.utxos[0].script, 1_000_000, 0x4f41, sighash::SignatureVersion::Base)
        .unwrap();
    let witness = sighash::witness_v0_signature_hash(
        &unsigned,
        0,
        &request.utxos[0].script,
        1_000_000,
        0x4f41,
        capability.params().hasher,
    )
    .unwrap();
    assert_eq!(forked, witness);
}

fn p2pkh_address(chain: ChainId, hash: [u8; 20]) -> String {
    let mut payload = chain::chain_params(chain).p2pkh_prefix.clone();
    payload.extend_from_slice(&hash);
    bs58::encode(payload).with_check().into_string()
}
