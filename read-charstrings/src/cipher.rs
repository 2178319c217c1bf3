//! The Type 1 stream cipher.
//!
//! See section 7 of "Adobe Type 1 Font Format"
//! <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=69>

/// Initial key for charstring and subroutine encryption.
pub const CHARSTRING_KEY: u16 = 4330;

/// Initial key for eexec encryption of the private portion of a font.
pub const EEXEC_KEY: u16 = 55665;

const C1: u16 = 52845;
const C2: u16 = 22719;

/// Running state of the decryption cipher.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Cipher {
    r: u16,
}

impl Cipher {
    /// Creates a cipher with the given initial key.
    pub const fn new(key: u16) -> Self {
        Self { r: key }
    }

    /// Decrypts a single byte and advances the key.
    #[inline(always)]
    pub fn decrypt(&mut self, cipher: u8) -> u8 {
        let plain = cipher ^ (self.r >> 8) as u8;
        self.r = (cipher as u16)
            .wrapping_add(self.r)
            .wrapping_mul(C1)
            .wrapping_add(C2);
        plain
    }

    /// Encrypts a single byte and advances the key.
    #[inline(always)]
    pub fn encrypt(&mut self, plain: u8) -> u8 {
        let cipher = plain ^ (self.r >> 8) as u8;
        self.r = (cipher as u16)
            .wrapping_add(self.r)
            .wrapping_mul(C1)
            .wrapping_add(C2);
        cipher
    }
}

/// Decrypts `data` in place with the given initial key.
///
/// The caller is responsible for skipping the leading random bytes.
pub fn decrypt_in_place(data: &mut [u8], key: u16) {
    let mut cipher = Cipher::new(key);
    for byte in data {
        *byte = cipher.decrypt(*byte);
    }
}

/// Returns an iterator over the decrypted bytes of an eexec section,
/// skipping the four leading random bytes.
pub fn eexec_decrypt(data: &[u8]) -> impl Iterator<Item = u8> + '_ {
    let mut cipher = Cipher::new(EEXEC_KEY);
    data.iter().map(move |b| cipher.decrypt(*b)).skip(4)
}
