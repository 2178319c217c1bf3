//! Byte reader for (possibly encrypted) charstring data.

use super::{cipher::Cipher, Error};

/// Position within a charstring along with the decryption state at that
/// position.
///
/// This is cheap to copy so that the interpreter can save and restore
/// decoding positions.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    cipher: Option<Cipher>,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor over unencrypted data.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            cipher: None,
        }
    }

    /// Creates a cursor over encrypted data, skipping `skip` leading
    /// bytes after decryption.
    pub fn new_encrypted(data: &'a [u8], key: u16, skip: usize) -> Self {
        let mut cipher = Cipher::new(key);
        for byte in data.iter().take(skip) {
            cipher.decrypt(*byte);
        }
        Self {
            data,
            pos: skip.min(data.len()),
            cipher: Some(cipher),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = *self.data.get(self.pos).ok_or(Error::UnexpectedEnd)?;
        self.pos += 1;
        Ok(match self.cipher.as_mut() {
            Some(cipher) => cipher.decrypt(byte),
            None => byte,
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(i16::from_be_bytes([self.read_u8()?, self.read_u8()?]))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_be_bytes([
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::CHARSTRING_KEY;

    #[test]
    fn plain_reads() {
        let mut cursor = Cursor::new(&[0x01, 0xFF, 0xFE, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(cursor.read_u8(), Ok(1));
        assert_eq!(cursor.read_i16(), Ok(-2));
        assert_eq!(cursor.read_i32(), Ok(0x0001_0000));
        assert!(cursor.is_empty());
        assert_eq!(cursor.read_u8(), Err(Error::UnexpectedEnd));
    }

    #[test]
    fn encrypted_reads_restart_from_copy() {
        let plain = [0u8, 0, 0, 0, 139, 140, 14];
        let mut encrypter = Cipher::new(CHARSTRING_KEY);
        let data: Vec<u8> = plain.iter().map(|b| encrypter.encrypt(*b)).collect();
        let mut cursor = Cursor::new_encrypted(&data, CHARSTRING_KEY, 4);
        // The lenIV bytes are skipped
        assert_eq!(cursor.pos, 4);
        let saved = cursor;
        assert_eq!(cursor.read_u8(), Ok(139));
        assert_eq!(cursor.read_u8(), Ok(140));
        // a saved cursor replays with the same key state
        let mut replay = saved;
        assert_eq!(replay.read_u8(), Ok(139));
        assert_eq!(cursor.read_u8(), Ok(14));
    }
}
