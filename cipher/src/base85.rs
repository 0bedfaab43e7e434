//! Radix-85 text encoding with the RFC 1924 alphabet.
//!
//! Output matches Python's `base64.b85encode` without padding: each 4-byte
//! group becomes 5 characters, and a trailing group of `n` bytes becomes
//! `n + 1` characters.

const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

#[must_use]
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(4) * 5);
    for chunk in data.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(group);

        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        out.extend(digits[..=chunk.len()].iter().map(|&b| char::from(b)));
    }
    out
}
