//! Address decoding for Base58Check and Bech32 (segwit) addresses

use crate::chain::{Base58Checksum, ChainParams};
use crate::error::{Result, SigningError};
use crate::hashes::double_groestl512;

/// Decoded payment destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    PubKeyHash([u8; 20]),
    ScriptHash([u8; 20]),
    WitnessPubKeyHash([u8; 20]),
    WitnessScriptHash([u8; 32]),
    /// Any other witness version (e.g. taproot)
    WitnessProgram { version: u8, program: Vec<u8> },
}

/// Decode `address` for the chain described by `params`
///
/// Fails with `InvalidAddress` on malformed input, bad checksums, or a prefix/HRP that
/// belongs to another network.
pub fn decode_address(address: &str, params: &ChainParams) -> Result<Destination> {
    let address = address.trim();
    if address.is_empty() {
        return Err(SigningError::InvalidAddress("empty address".to_string()));
    }

    if let Some(hrp) = &params.hrp {
        let separator = format!("{}1", hrp);
        if address.to_lowercase().starts_with(&separator) {
            return decode_segwit(address, hrp);
        }
    }

    decode_base58(address, params)
}

fn decode_segwit(address: &str, expected_hrp: &str) -> Result<Destination> {
    let (hrp, version, program) = bech32::segwit::decode(address)
        .map_err(|e| SigningError::InvalidAddress(format!("{}: {}", address, e)))?;
    if hrp.to_lowercase() != expected_hrp {
        return Err(SigningError::InvalidAddress(format!(
            "{}: unexpected prefix {}",
            address,
            hrp.to_lowercase()
        )));
    }

    match (version.to_u8(), program.len()) {
        (0, 20) => {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&program);
            Ok(Destination::WitnessPubKeyHash(hash))
        }
        (0, 32) => {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&program);
            Ok(Destination::WitnessScriptHash(hash))
        }
        (0, len) => Err(SigningError::InvalidAddress(format!(
            "{}: invalid v0 program length {}",
            address, len
        ))),
        (version, _) => Ok(Destination::WitnessProgram { version, program }),
    }
}

fn decode_base58(address: &str, params: &ChainParams) -> Result<Destination> {
    let payload = match params.base58_checksum {
        Base58Checksum::Sha256d => bs58::decode(address)
            .with_check(None)
            .into_vec()
            .map_err(|e| SigningError::InvalidAddress(format!("{}: {}", address, e)))?,
        Base58Checksum::Groestl512d => decode_groestl_check(address)?,
    };

    let prefix_len = params.p2pkh_prefix.len();
    if payload.len() != prefix_len + 20 {
        return Err(SigningError::InvalidAddress(format!(
            "{}: unexpected payload length {}",
            address,
            payload.len()
        )));
    }

    let (prefix, body) = payload.split_at(prefix_len);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(body);

    if prefix == params.p2pkh_prefix.as_slice() {
        Ok(Destination::PubKeyHash(hash))
    } else if prefix == params.p2sh_prefix.as_slice() {
        Ok(Destination::ScriptHash(hash))
    } else {
        Err(SigningError::InvalidAddress(format!(
            "{}: prefix {} does not belong to {:?}",
            address,
            hex::encode(prefix),
            params.chain
        )))
    }
}

fn decode_groestl_check(address: &str) -> Result<Vec<u8>> {
    let raw = bs58::decode(address)
        .into_vec()
        .map_err(|e| SigningError::InvalidAddress(format!("{}: {}", address, e)))?;
    if raw.len() < 5 {
        return Err(SigningError::InvalidAddress(format!("{}: too short", address)));
    }
    let (payload, checksum) = raw.split_at(raw.len() - 4);
    if double_groestl512(payload)[..4] != *checksum {
        return Err(SigningError::InvalidAddress(format!("{}: invalid checksum", address)));
    }
    Ok(payload.to_vec())
}

/// Check that `address` is valid for the chain
pub fn is_valid_address(address: &str, params: &ChainParams) -> bool {
    decode_address(address, params).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainId, ChainParams};

    fn params(chain: ChainId) -> ChainParams {
        ChainParams::defaults(chain)
    }

    #[test]
    fn test_decode_p2pkh() {
        let dest = decode_address("1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx", &params(ChainId::Bitcoin)).unwrap();
        assert_eq!(
            dest,
            Destination::PubKeyHash(hex_hash("769bdff96a02f9135a1d19b749db6a78fe07dc90"))
        );
    }

    #[test]
    fn test_decode_p2sh() {
        let hash = hex_hash("d3eb0e7e8b5d0f3e7e4bd5bc7c0cd9ce1dcad4a1");
        let mut payload = vec![0x05];
        payload.extend_from_slice(&hash);
        let address = bs58::encode(payload).with_check().into_string();
        assert!(address.starts_with('3'));

        let dest = decode_address(&address, &params(ChainId::Bitcoin)).unwrap();
        assert_eq!(dest, Destination::ScriptHash(hash));
    }

    #[test]
    fn test_decode_native_segwit() {
        let dest = decode_address(
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            &params(ChainId::Bitcoin),
        )
        .unwrap();
        assert_eq!(
            dest,
            Destination::WitnessPubKeyHash(hex_hash("751e76e8199196d454941c45d1b3a323f1433bd6"))
        );
    }

    #[test]
    fn test_decode_uppercase_segwit() {
        let dest = decode_address(
            "BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4",
            &params(ChainId::Bitcoin),
        )
        .unwrap();
        assert!(matches!(dest, Destination::WitnessPubKeyHash(_)));
    }

    #[test]
    fn test_wrong_network_rejected() {
        // Litecoin address on Bitcoin
        assert!(decode_address("LV7LV7Z4bWDEjYkfx9dQo6k6RjGbXsg6hS", &params(ChainId::Bitcoin)).is_err());
        // Bitcoin segwit address on Litecoin
        assert!(decode_address(
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            &params(ChainId::Litecoin)
        )
        .is_err());
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let err = decode_address("1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcy", &params(ChainId::Bitcoin)).unwrap_err();
        assert!(matches!(err, SigningError::InvalidAddress(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(!is_valid_address("", &params(ChainId::Bitcoin)));
        assert!(!is_valid_address("not-an-address", &params(ChainId::Bitcoin)));
        assert!(!is_valid_address("0OIl", &params(ChainId::Bitcoin)));
    }

    #[test]
    fn test_zcash_two_byte_prefix() {
        let dest = decode_address("t1QahNjDdibyE4EdYkawUSKBBcVTSqv64CS", &params(ChainId::Zcash)).unwrap();
        assert_eq!(
            dest,
            Destination::PubKeyHash(hex_hash("49964a736f3713d64283fd0018626ba50091c7e9"))
        );
    }

    #[test]
    fn test_groestl_checksum_on_sha256d_address_fails() {
        assert!(!is_valid_address("1Bp9U1ogV3A14FMvKbRJms7ctyso4Z4Tcx", &params(ChainId::Groestlcoin)));
    }

    fn hex_hash(s: &str) -> [u8; 20] {
        let mut out = [0u8; 20];
        hex::decode_to_slice(s, &mut out).unwrap();
        out
    }
}
