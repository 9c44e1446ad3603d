//! Pass-through crypto provider.
//!
//! Used for fast protocol and timing tests: "encryption" leaves the payload untouched and
//! appends [`PLACEHOLDER_TAG`] (repeated to the requested MAC length). Decryption strips the
//! tag and reports a MAC error only when the placeholder does not match, so a pass-through
//! transmitter and receiver interoperate.

use super::{BLOCK_SIZE, CryptoBackend, Decrypted, Key, Nonce};

/// Pattern the placeholder MAC is built from.
pub const PLACEHOLDER_TAG: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

/// Crypto provider that performs no cryptography.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughBackend;

fn placeholder_tag(mac_len: usize) -> impl Iterator<Item = u8> {
    PLACEHOLDER_TAG.iter().copied().cycle().take(mac_len)
}

impl CryptoBackend for PassthroughBackend {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn ecb_encrypt(&self, _key: &Key, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        *block
    }

    fn ccm_encrypt(
        &self,
        _adata: &[u8],
        payload: &[u8],
        _key: &Key,
        _nonce: &Nonce,
        mac_len: usize,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + mac_len);
        out.extend_from_slice(payload);
        out.extend(placeholder_tag(mac_len));
        out
    }

    fn ccm_decrypt(
        &self,
        _adata: &[u8],
        payload: &[u8],
        _key: &Key,
        _nonce: &Nonce,
        mac_len: usize,
        no_mac: bool,
    ) -> Decrypted {
        let mac_len = if no_mac { 0 } else { mac_len };
        let Some(split) = payload.len().checked_sub(mac_len) else {
            return Decrypted {
                plaintext: Vec::new(),
                mac_error: true,
            };
        };
        let (body, tag) = payload.split_at(split);
        Decrypted {
            plaintext: body.to_vec(),
            mac_error: !tag.iter().copied().eq(placeholder_tag(mac_len)),
        }
    }
}
