use crate::error::CipherError;
use crate::generator::ByteGenerator;

/// XORs data against a keystream, one keystream value per byte.
///
/// Only the low eight bits of each value are used. Every call consumes
/// `data.len()` values, so masking the same input twice on one instance gives
/// two different outputs.
#[derive(Debug, Clone)]
pub struct StreamMask<K> {
    keystream: K,
    consumed: usize,
}

impl<K> StreamMask<K> {
    pub fn new(keystream: K) -> Self {
        Self {
            keystream,
            consumed: 0,
        }
    }

    /// Keystream values used by this mask so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

fn xor_byte(byte: u8, value: i32) -> u8 {
    byte ^ (value & 0xFF) as u8
}

impl<K: Iterator<Item = i32>> StreamMask<K> {
    /// Mask `data` with the next `data.len()` keystream values.
    ///
    /// Fails if the keystream ends early; values drawn before the failure stay
    /// consumed.
    pub fn mask(&mut self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut out = Vec::with_capacity(data.len());
        for (produced, &byte) in data.iter().enumerate() {
            let Some(value) = self.keystream.next() else {
                return Err(CipherError::KeystreamExhausted {
                    needed: data.len(),
                    produced,
                });
            };
            self.consumed += 1;
            out.push(xor_byte(byte, value));
        }
        Ok(out)
    }
}

impl StreamMask<ByteGenerator> {
    /// Infallible masking over an endless generator.
    pub fn apply(&mut self, data: &[u8]) -> Vec<u8> {
        self.consumed += data.len();
        data.iter()
            .map(|&byte| xor_byte(byte, self.keystream.next_value()))
            .collect()
    }
}
