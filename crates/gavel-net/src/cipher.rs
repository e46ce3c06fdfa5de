//! Header obfuscation cipher.
//!
//! A lightweight, non-cryptographic stream transform. Each plaintext byte is
//! XORed with bits 8..16 of a rolling key, and the key is advanced from the
//! produced ciphertext byte:
//!
//! ```text
//! c[i] = p[i] ^ ((key >> 8) & 0xFF)
//! key  = (c[i] + key) * 53761 + 32618      (wrapping u32)
//! ```
//!
//! Ciphertext is rendered as uppercase hex, two digits per byte. Servers that
//! require it hand out the key in the `decryptor` packet, itself enciphered
//! with [`DECRYPTOR_KEY`].

use std::fmt::Write;

use crate::packet::Packet;

const MULTIPLIER: u32 = 53761;
const INCREMENT: u32 = 32618;

/// Shared constant used to recover the session key from a `decryptor` token.
pub const DECRYPTOR_KEY: u32 = 322;

fn advance(key: u32, cipher_byte: u8) -> u32 {
    u32::from(cipher_byte)
        .wrapping_add(key)
        .wrapping_mul(MULTIPLIER)
        .wrapping_add(INCREMENT)
}

fn mask(key: u32) -> u8 {
    ((key >> 8) & 0xFF) as u8
}

/// Encrypt `plain` under `key`, returning uppercase hex.
pub fn encrypt(plain: &[u8], key: u32) -> String {
    let mut key = key;
    let mut out = String::with_capacity(plain.len() * 2);
    for &byte in plain {
        let cipher_byte = byte ^ mask(key);
        let _ = write!(out, "{cipher_byte:02X}");
        key = advance(key, cipher_byte);
    }
    out
}

/// Decrypt hex ciphertext under `key`.
///
/// Returns `None` if `hex` is not an even-length hex string.
pub fn decrypt(hex: &str, key: u32) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }

    let mut key = key;
    let mut out = Vec::with_capacity(hex.len() / 2);
    for pair in hex.as_bytes().chunks(2) {
        let digits = std::str::from_utf8(pair).ok()?;
        let cipher_byte = u8::from_str_radix(digits, 16).ok()?;
        out.push(cipher_byte ^ mask(key));
        key = advance(key, cipher_byte);
    }
    Some(out)
}

/// Recover the session key from a `decryptor` token.
///
/// Tokens that do not decrypt to a decimal number yield 0, which is also
/// what the compatibility sentinel `NOENCRYPT` produces.
pub fn decode_key(token: &str) -> u32 {
    decrypt(token, DECRYPTOR_KEY)
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|text| text.parse::<u32>().ok())
        .unwrap_or(0)
}

/// Return a copy of `packet` with only its header enciphered under `key`.
pub fn obfuscate_header(packet: &Packet, key: u32) -> Packet {
    Packet {
        header: encrypt(packet.header.as_bytes(), key),
        fields: packet.fields.clone(),
    }
}

/// Reverse [`obfuscate_header`].
///
/// Returns `None` when the header is not valid cipher text.
pub fn reveal_header(packet: &Packet, key: u32) -> Option<Packet> {
    let plain = decrypt(&packet.header, key)?;
    Some(Packet {
        header: String::from_utf8_lossy(&plain).into_owned(),
        fields: packet.fields.clone(),
    })
}
