//! Utility functions for id encoding

use bech32::{Bech32m, Hrp};

/// Encode raw id bytes under the given human readable prefix.
pub fn bytes_to_bech32(hrp: &str, bytes: &[u8]) -> anyhow::Result<String> {
    let hrp = Hrp::parse(hrp)?;
    Ok(bech32::encode::<Bech32m>(hrp, bytes)?)
}

/// Decode a bech32 string, checking that it carries the expected prefix and a
/// 16 byte payload.
pub fn bech32_to_bytes(hrp: &str, encoded: &str) -> anyhow::Result<[u8; 16]> {
    let (found, data) = bech32::decode(encoded)?;
    if found.as_str() != hrp {
        anyhow::bail!("expected prefix {hrp}, found {}", found.as_str());
    }
    <[u8; 16]>::try_from(data.as_slice())
        .map_err(|_| anyhow::anyhow!("expected 16 byte payload, found {}", data.len()))
}

/// Concatenate two ids into a composite sled key. Prefix scans over the first
/// half return the second half in byte order.
pub fn compound_key(a: &[u8; 16], b: &[u8; 16]) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(a);
    key[16..].copy_from_slice(b);
    key
}

/// Split the trailing 16 bytes off a composite key.
pub fn key_suffix(key: &[u8]) -> Option<[u8; 16]> {
    if key.len() < 16 {
        return None;
    }
    <[u8; 16]>::try_from(&key[key.len() - 16..]).ok()
}
