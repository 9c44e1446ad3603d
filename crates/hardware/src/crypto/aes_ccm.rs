//! AES-128 and CCM provider.
//!
//! Everything here is RustCrypto: `aes` for the single-block cipher, `ccm` for the
//! authenticated modes (RFC 3610 with a 13-byte nonce, L = 2, which is the layout both BLE and
//! IEEE 802.15.4 use) and `ctr` for the MAC-less CCM* case, which `ccm` cannot express.

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use ccm::aead::AeadInPlace;
use ccm::aead::generic_array::ArrayLength;
use ccm::consts::{U4, U6, U8, U10, U12, U13, U14, U16};
use ccm::{Ccm, TagSize};
use ctr::cipher::{KeyIvInit, StreamCipher};

use super::{BLOCK_SIZE, CryptoBackend, Decrypted, Key, Nonce};

/// CTR mode with the full 16-byte block as a big-endian counter, as CCM formats it.
type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Real AES-128 / CCM provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesBackend;

/// Keystream for payload blocks, which starts at counter 1 (counter 0 encrypts the tag).
fn keystream(key: &Key, nonce: &Nonce, data: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; BLOCK_SIZE];
    iv[0] = 1; // flags: L - 1
    iv[1..14].copy_from_slice(nonce);
    iv[15] = 1;
    let mut out = data.to_vec();
    Aes128Ctr::new(GenericArray::from_slice(key), GenericArray::from_slice(&iv))
        .apply_keystream(&mut out);
    out
}

fn seal<M: ArrayLength<u8> + TagSize>(
    key: &Key,
    nonce: &Nonce,
    adata: &[u8],
    buf: &mut [u8],
) -> Result<Vec<u8>, ccm::Error> {
    Ccm::<Aes128, M, U13>::new(GenericArray::from_slice(key))
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), adata, buf)
        .map(|tag| tag.to_vec())
}

fn open<M: ArrayLength<u8> + TagSize>(
    key: &Key,
    nonce: &Nonce,
    adata: &[u8],
    buf: &mut [u8],
    tag: &[u8],
) -> Result<(), ccm::Error> {
    let Some(tag) = GenericArray::<u8, M>::from_exact_iter(tag.iter().copied()) else {
        return Err(ccm::Error);
    };
    Ccm::<Aes128, M, U13>::new(GenericArray::from_slice(key)).decrypt_in_place_detached(
        GenericArray::from_slice(nonce),
        adata,
        buf,
        &tag,
    )
}

/// Picks the `ccm` tag size type for a MAC length in bytes.
macro_rules! with_tag_size {
    ($mac_len:expr, $f:ident($($arg:expr),*)) => {
        match $mac_len {
            4 => $f::<U4>($($arg),*),
            6 => $f::<U6>($($arg),*),
            8 => $f::<U8>($($arg),*),
            10 => $f::<U10>($($arg),*),
            12 => $f::<U12>($($arg),*),
            14 => $f::<U14>($($arg),*),
            16 => $f::<U16>($($arg),*),
            _ => Err(ccm::Error),
        }
    };
}

impl CryptoBackend for AesBackend {
    fn name(&self) -> &str {
        "aes128"
    }

    fn ecb_encrypt(&self, key: &Key, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        let mut buf = GenericArray::clone_from_slice(block);
        Aes128::new(GenericArray::from_slice(key)).encrypt_block(&mut buf);
        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    fn ccm_encrypt(
        &self,
        adata: &[u8],
        payload: &[u8],
        key: &Key,
        nonce: &Nonce,
        mac_len: usize,
    ) -> Vec<u8> {
        if mac_len == 0 {
            return keystream(key, nonce, payload);
        }
        let mut out = payload.to_vec();
        match with_tag_size!(mac_len, seal(key, nonce, adata, &mut out)) {
            Ok(tag) => out.extend(tag),
            Err(_) => {
                tracing::error!(mac_len, "CCM seal failed; output carries no tag");
            }
        }
        out
    }

    fn ccm_decrypt(
        &self,
        adata: &[u8],
        payload: &[u8],
        key: &Key,
        nonce: &Nonce,
        mac_len: usize,
        no_mac: bool,
    ) -> Decrypted {
        if no_mac {
            return Decrypted {
                plaintext: keystream(key, nonce, payload),
                mac_error: false,
            };
        }
        let Some(split) = payload.len().checked_sub(mac_len) else {
            return Decrypted {
                plaintext: Vec::new(),
                mac_error: true,
            };
        };
        let (body, received) = payload.split_at(split);
        let mut plaintext = body.to_vec();
        match with_tag_size!(mac_len, open(key, nonce, adata, &mut plaintext, received)) {
            Ok(()) => Decrypted {
                plaintext,
                mac_error: false,
            },
            // `ccm` withholds the plaintext on a mismatch; the peripheral still outputs it.
            Err(_) => Decrypted {
                plaintext: keystream(key, nonce, body),
                mac_error: true,
            },
        }
    }
}
