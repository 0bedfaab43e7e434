use crate::generator::ByteGenerator;
use crate::mask::StreamMask;

/// Seeded XOR cipher. Encrypting and decrypting are the same operation.
///
/// This is an obfuscation and reproducible-derivation mechanism, not a
/// security-grade cipher: anyone holding the seed can recover the input.
///
/// A `Cipher` is consumed by its first call. Round-tripping needs a fresh
/// cipher per direction, because the keystream advances with every byte:
///
/// ```
/// use bestiary_cipher::Cipher;
///
/// let sealed = Cipher::new(114_514).encrypt(b"Slime");
/// let opened = Cipher::new(114_514).decrypt(&sealed);
/// assert_eq!(opened, b"Slime");
/// ```
///
/// Reusing one instance does not compile:
///
/// ```compile_fail
/// use bestiary_cipher::Cipher;
///
/// let cipher = Cipher::new(114_514);
/// let sealed = cipher.encrypt(b"Slime");
/// let _ = cipher.decrypt(&sealed);
/// ```
///
/// Callers that want the stateful behaviour can drive a [`StreamMask`]
/// directly.
#[derive(Debug)]
pub struct Cipher {
    mask: StreamMask<ByteGenerator>,
}

impl Cipher {
    #[must_use]
    pub fn new(seed: i64) -> Self {
        Self {
            mask: StreamMask::new(ByteGenerator::new(seed)),
        }
    }

    #[must_use]
    pub fn encrypt(mut self, data: &[u8]) -> Vec<u8> {
        self.mask.apply(data)
    }

    #[must_use]
    pub fn decrypt(self, data: &[u8]) -> Vec<u8> {
        self.encrypt(data)
    }
}

/// One-shot encryption of `data` under `seed`.
#[must_use]
pub fn encrypt(data: &[u8], seed: i64) -> Vec<u8> {
    Cipher::new(seed).encrypt(data)
}

/// Inverse of [`encrypt`]; identical bitwise operation.
#[must_use]
pub fn decrypt(data: &[u8], seed: i64) -> Vec<u8> {
    Cipher::new(seed).decrypt(data)
}
