//! Operand encodings for Type 1 and Type 2 charstrings.

use ps_types::Fixed;

use super::{cursor::Cursor, CharstringKind, Error, Number};

/// Decodes the number that begins with `b0`.
///
/// ```text
/// Size   b0 range     Value range              Value calculation
/// -----------------------------------------------------------------------
/// 1      32 to 246    -107 to +107             b0 - 139
/// 2      247 to 250   +108 to +1131            (b0 - 247) * 256 + b1 + 108
/// 2      251 to 254   -1131 to -108            -(b0 - 251) * 256 - b1 - 108
/// 3      28           -32768 to +32767         b1 << 8 | b2 (Type 2 only)
/// 5      255          -(2^31) to +(2^31 - 1)   32-bit integer (Type 1)
/// 5      255          16.16 fixed point        (Type 2)
/// ```
///
/// See "3.2 Charstring Number Encoding" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=12>
pub(crate) fn read_number(
    cursor: &mut Cursor,
    b0: u8,
    kind: CharstringKind,
) -> Result<Number, Error> {
    Ok(match b0 {
        32..=246 => Number::I32(b0 as i32 - 139),
        247..=250 => Number::I32((b0 as i32 - 247) * 256 + cursor.read_u8()? as i32 + 108),
        251..=254 => Number::I32(-(b0 as i32 - 251) * 256 - cursor.read_u8()? as i32 - 108),
        28 if kind == CharstringKind::Type2 => Number::I32(cursor.read_i16()? as i32),
        255 => {
            let value = cursor.read_i32()?;
            match kind {
                CharstringKind::Type1 => Number::I32(value),
                CharstringKind::Type2 => Number::Fixed(Fixed::from_bits(value)),
            }
        }
        _ => return Err(Error::InvalidNumber(b0)),
    })
}

/// Encoded form of a single charstring operand.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct EncodedNumber {
    bytes: [u8; 5],
    len: u8,
}

impl EncodedNumber {
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    fn from_slice(bytes: &[u8]) -> Self {
        let mut result = Self {
            bytes: [0; 5],
            len: bytes.len() as u8,
        };
        result.bytes[..bytes.len()].copy_from_slice(bytes);
        result
    }
}

/// Returns the shortest encoding of `number` for the given charstring
/// kind.
///
/// Type 1 charstrings have no fixed point encoding so fractional values
/// are rounded to the nearest integer.
pub fn encode_number(number: Number, kind: CharstringKind) -> EncodedNumber {
    let value = match number {
        Number::I32(value) => value,
        Number::Fixed(value) => match kind {
            CharstringKind::Type2 => {
                let mut bytes = [255, 0, 0, 0, 0];
                bytes[1..].copy_from_slice(&value.to_bits().to_be_bytes());
                return EncodedNumber::from_slice(&bytes);
            }
            CharstringKind::Type1 => value.round().to_i32(),
        },
    };
    match value {
        -107..=107 => EncodedNumber::from_slice(&[(value + 139) as u8]),
        108..=1131 => {
            let v = value - 108;
            EncodedNumber::from_slice(&[(v / 256 + 247) as u8, (v % 256) as u8])
        }
        -1131..=-108 => {
            let v = -value - 108;
            EncodedNumber::from_slice(&[(v / 256 + 251) as u8, (v % 256) as u8])
        }
        _ => match kind {
            CharstringKind::Type1 => {
                let mut bytes = [255, 0, 0, 0, 0];
                bytes[1..].copy_from_slice(&value.to_be_bytes());
                EncodedNumber::from_slice(&bytes)
            }
            CharstringKind::Type2 => {
                if let Ok(short) = i16::try_from(value) {
                    let [hi, lo] = short.to_be_bytes();
                    EncodedNumber::from_slice(&[28, hi, lo])
                } else {
                    // no integer form this wide; use 16.16 and wrap as the
                    // decoder would
                    let mut bytes = [255, 0, 0, 0, 0];
                    bytes[1..].copy_from_slice(&Fixed::from_i32(value).to_bits().to_be_bytes());
                    EncodedNumber::from_slice(&bytes)
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8], kind: CharstringKind) -> Number {
        let mut cursor = Cursor::new(bytes);
        let b0 = cursor.read_u8().unwrap();
        let number = read_number(&mut cursor, b0, kind).unwrap();
        assert!(cursor.is_empty());
        number
    }

    #[test]
    fn one_two_and_five_byte_integers() {
        use CharstringKind::*;
        assert_eq!(decode(&[139], Type1), Number::I32(0));
        assert_eq!(decode(&[32], Type2), Number::I32(-107));
        assert_eq!(decode(&[247, 0], Type1), Number::I32(108));
        assert_eq!(decode(&[250, 255], Type1), Number::I32(1131));
        assert_eq!(decode(&[254, 255], Type2), Number::I32(-1131));
        assert_eq!(decode(&[28, 0x80, 0x00], Type2), Number::I32(-32768));
        assert_eq!(
            decode(&[255, 0x00, 0x01, 0x86, 0xA0], Type1),
            Number::I32(100_000)
        );
        assert_eq!(
            decode(&[255, 0x00, 0x01, 0x80, 0x00], Type2),
            Number::Fixed(Fixed::from_f64(1.5))
        );
    }

    #[test]
    fn shortint_is_type2_only() {
        let mut cursor = Cursor::new(&[0, 1]);
        assert_eq!(
            read_number(&mut cursor, 28, CharstringKind::Type1),
            Err(Error::InvalidNumber(28))
        );
    }

    #[test]
    fn truncated_number() {
        let mut cursor = Cursor::new(&[0x00, 0x01]);
        assert_eq!(
            read_number(&mut cursor, 255, CharstringKind::Type1),
            Err(Error::UnexpectedEnd)
        );
    }

    #[test]
    fn decode_encode_in_range_integers() {
        for kind in [CharstringKind::Type1, CharstringKind::Type2] {
            for value in (-40000..=40000).step_by(7).chain([i16::MIN as i32, 1131, -1131]) {
                let encoded = encode_number(Number::I32(value), kind);
                let decoded = decode(encoded.as_slice(), kind);
                let expected = if kind == CharstringKind::Type2 && i16::try_from(value).is_err()
                {
                    Number::Fixed(Fixed::from_i32(value))
                } else {
                    Number::I32(value)
                };
                assert_eq!(decoded, expected, "{kind:?} {value}");
            }
        }
    }

    #[test]
    fn shortest_encodings() {
        assert_eq!(
            encode_number(Number::I32(100), CharstringKind::Type1).as_slice(),
            &[239]
        );
        assert_eq!(
            encode_number(Number::I32(-500), CharstringKind::Type2).as_slice(),
            &[252, 136]
        );
        assert_eq!(
            encode_number(Number::I32(2000), CharstringKind::Type2).as_slice(),
            &[28, 0x07, 0xD0]
        );
        assert_eq!(
            encode_number(Number::I32(2000), CharstringKind::Type1).as_slice(),
            &[255, 0, 0, 0x07, 0xD0]
        );
    }
}
