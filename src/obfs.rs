//! Reversible masking of configuration values kept at rest.
//!
//! Values are obscured the way rclone does it (AES-256-CTR under a fixed key,
//! random IV, unpadded URL-safe base64) and tagged with [`OBFUSCATED_PREFIX`]
//! so that masking and revealing are both idempotent.

use std::fmt;

use aes::Aes256;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;

use crate::RevealError;

/// Marker prepended to every obfuscated value.
pub const OBFUSCATED_PREFIX: &str = "___Obfuscated___";

const IV_LEN: usize = 16;

const CRYPT_KEY: [u8; 32] = [
    0x9c, 0x93, 0x5b, 0x48, 0x73, 0x0a, 0x55, 0x4d, 0x6b, 0xfd, 0x7c, 0x63, 0xc8, 0x86, 0xa9, 0x2b,
    0xd3, 0x90, 0x19, 0x8e, 0xb8, 0x12, 0x8a, 0xfb, 0xf4, 0xde, 0x16, 0x2b, 0x8b, 0x95, 0xf6, 0x38,
];

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Returns `plain` obscured and marked. Marked input is returned unchanged.
pub fn obfuscate(plain: &str) -> String {
    if is_obfuscated(plain) {
        return plain.to_owned();
    }
    format!("{OBFUSCATED_PREFIX}{}", obscure(plain.as_bytes()))
}

/// Returns the plaintext of a marked value. Unmarked input is returned unchanged.
pub fn reveal(value: &str) -> Result<String, RevealError> {
    let Some(payload) = value.strip_prefix(OBFUSCATED_PREFIX) else {
        return Ok(value.to_owned());
    };
    let plain = unobscure(payload)?;
    String::from_utf8(plain).map_err(|_| RevealError::Utf8)
}

/// Whether `value` carries the obfuscation marker.
pub fn is_obfuscated(value: &str) -> bool {
    value.starts_with(OBFUSCATED_PREFIX)
}

fn obscure(plain: &[u8]) -> String {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let mut out = Vec::with_capacity(IV_LEN + plain.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(plain);
    apply_keystream(&iv, &mut out[IV_LEN..]);
    URL_SAFE_NO_PAD.encode(out)
}

fn unobscure(payload: &str) -> Result<Vec<u8>, RevealError> {
    let raw = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| RevealError::Base64)?;
    if raw.len() < IV_LEN {
        return Err(RevealError::TooShort);
    }
    let (iv, cipher) = raw.split_at(IV_LEN);
    let mut plain = cipher.to_vec();
    apply_keystream(iv, &mut plain);
    Ok(plain)
}

fn apply_keystream(iv: &[u8], buf: &mut [u8]) {
    let mut cipher = Aes256Ctr::new(&CRYPT_KEY.into(), iv.into());
    cipher.apply_keystream(buf);
}

/// Text kept in plaintext in memory and obfuscated when persisted.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ObfusText {
    text: String,
}

impl ObfusText {
    /// Wraps a plaintext value.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Builds a value from its persisted form, marked or not.
    pub fn from_stored(stored: &str) -> Result<Self, RevealError> {
        Ok(Self::new(reveal(stored)?))
    }

    /// Plaintext value.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Persisted, obfuscated form.
    pub fn to_stored(&self) -> String {
        obfuscate(&self.text)
    }
}

impl fmt::Display for ObfusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for ObfusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObfusText(..)")
    }
}

impl From<String> for ObfusText {
    fn from(text: String) -> Self {
        Self { text }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ObfusText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_stored())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ObfusText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let stored = String::deserialize(deserializer)?;
        Self::from_stored(&stored).map_err(serde::de::Error::custom)
    }
}
