//! Crypto primitive providers.
//!
//! Peripherals never implement cryptography themselves; they call into a [`CryptoBackend`]
//! injected into the [`System`](crate::soc::System) at construction time. Two providers ship
//! with the crate:
//! 1. **`AesBackend`:** AES-128 and CCM (RFC 3610, 13-byte nonce) from the RustCrypto `aes`, `ccm`
//!    and `ctr` crates.
//! 2. **`PassthroughBackend`:** Copies plaintext unmodified and appends a placeholder MAC, for
//!    protocol and timing tests that do not care about the cipher.

#[cfg(feature = "aes-backend")]
mod aes_ccm;
mod passthrough;

#[cfg(feature = "aes-backend")]
pub use aes_ccm::AesBackend;
pub use passthrough::{PLACEHOLDER_TAG, PassthroughBackend};

use crate::config::{CryptoBackendKind, CryptoConfig};

/// AES block and key size in bytes.
pub const BLOCK_SIZE: usize = 16;
/// CCM nonce size in bytes (L = 2).
pub const NONCE_SIZE: usize = 13;

/// 128-bit cipher key.
pub type Key = [u8; BLOCK_SIZE];
/// CCM nonce.
pub type Nonce = [u8; NONCE_SIZE];

/// Result of an authenticated decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    /// Recovered plaintext (the MAC is stripped).
    pub plaintext: Vec<u8>,
    /// `true` if the received MAC did not match.
    pub mac_error: bool,
}

/// Block cipher and authenticated encryption primitives used by the peripherals.
pub trait CryptoBackend {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Encrypts one block with AES-128.
    fn ecb_encrypt(&self, key: &Key, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE];

    /// Encrypts `payload` and appends a `mac_len`-byte tag computed over `adata` and `payload`.
    fn ccm_encrypt(
        &self,
        adata: &[u8],
        payload: &[u8],
        key: &Key,
        nonce: &Nonce,
        mac_len: usize,
    ) -> Vec<u8>;

    /// Decrypts `payload` (ciphertext followed by a `mac_len`-byte tag) and checks the tag.
    ///
    /// With `no_mac` set the tag is neither present nor checked.
    fn ccm_decrypt(
        &self,
        adata: &[u8],
        payload: &[u8],
        key: &Key,
        nonce: &Nonce,
        mac_len: usize,
        no_mac: bool,
    ) -> Decrypted;
}

/// Builds the provider selected by the configuration.
///
/// Requesting `Aes` from a build without the `aes-backend` feature logs a warning and
/// returns the pass-through provider instead.
pub fn from_config(config: &CryptoConfig) -> Box<dyn CryptoBackend> {
    match config.backend {
        CryptoBackendKind::Aes => aes_or_fallback(),
        CryptoBackendKind::Passthrough => Box::new(PassthroughBackend),
    }
}

#[cfg(feature = "aes-backend")]
fn aes_or_fallback() -> Box<dyn CryptoBackend> {
    Box::new(AesBackend)
}

#[cfg(not(feature = "aes-backend"))]
fn aes_or_fallback() -> Box<dyn CryptoBackend> {
    tracing::warn!("AES backend not built in; using pass-through crypto");
    Box::new(PassthroughBackend)
}
