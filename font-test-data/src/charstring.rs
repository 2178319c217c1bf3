//! Assembler for charstring source text.
//!
//! Source is a whitespace separated list of tokens in charstring order:
//!
//! * integers (`-50`, `1200`) and, for Type 2 only, decimals (`0.25`)
//! * operator names (`hsbw`, `rmoveto`, `hintmask`, ...)
//! * raw bytes written as `#` followed by two hex digits (`#c0`), used for
//!   hint mask data or to produce deliberately malformed charstrings.
//!
//! Panics on malformed source, which is always a bug in a test.

/// Assembles Type 1 charstring source into unencrypted bytes.
pub fn assemble_type1(source: &str) -> Vec<u8> {
    assemble(source, false)
}

/// Assembles Type 2 charstring source into bytes.
pub fn assemble_type2(source: &str) -> Vec<u8> {
    assemble(source, true)
}

/// Encrypts a Type 1 charstring, prefixing `len_iv` padding bytes.
pub fn encrypt_charstring(plain: &[u8], len_iv: usize) -> Vec<u8> {
    let mut r: u16 = 4330;
    std::iter::repeat(0u8)
        .take(len_iv)
        .chain(plain.iter().copied())
        .map(|p| {
            let c = p ^ (r >> 8) as u8;
            r = (c as u16).wrapping_add(r).wrapping_mul(52845).wrapping_add(22719);
            c
        })
        .collect()
}

fn assemble(source: &str, is_type2: bool) -> Vec<u8> {
    let mut bytes = Vec::new();
    for token in source.split_whitespace() {
        if let Some(hex) = token.strip_prefix('#') {
            let byte = u8::from_str_radix(hex, 16)
                .unwrap_or_else(|_| panic!("invalid raw byte {token:?}"));
            bytes.push(byte);
        } else if let Ok(value) = token.parse::<i32>() {
            encode_int(&mut bytes, value, is_type2);
        } else if let Ok(value) = token.parse::<f64>() {
            assert!(is_type2, "fractional operand {token} in a Type 1 charstring");
            let bits = (value * 65536.0).round() as i32;
            bytes.push(255);
            bytes.extend(bits.to_be_bytes());
        } else {
            let (escaped, opcode) = if is_type2 {
                type2_operator(token)
            } else {
                type1_operator(token)
            }
            .unwrap_or_else(|| panic!("unknown operator {token:?}"));
            if escaped {
                bytes.push(12);
            }
            bytes.push(opcode);
        }
    }
    bytes
}

fn encode_int(bytes: &mut Vec<u8>, value: i32, is_type2: bool) {
    match value {
        -107..=107 => bytes.push((value + 139) as u8),
        108..=1131 => {
            let v = value - 108;
            bytes.extend([(v / 256 + 247) as u8, (v % 256) as u8]);
        }
        -1131..=-108 => {
            let v = -value - 108;
            bytes.extend([(v / 256 + 251) as u8, (v % 256) as u8]);
        }
        _ if !is_type2 => {
            bytes.push(255);
            bytes.extend(value.to_be_bytes());
        }
        -32768..=32767 => {
            bytes.push(28);
            bytes.extend((value as i16).to_be_bytes());
        }
        _ => panic!("integer {value} does not fit in a Type 2 operand"),
    }
}

fn type1_operator(name: &str) -> Option<(bool, u8)> {
    Some(match name {
        "hstem" => (false, 1),
        "vstem" => (false, 3),
        "vmoveto" => (false, 4),
        "rlineto" => (false, 5),
        "hlineto" => (false, 6),
        "vlineto" => (false, 7),
        "rrcurveto" => (false, 8),
        "closepath" => (false, 9),
        "callsubr" => (false, 10),
        "return" => (false, 11),
        "hsbw" => (false, 13),
        "endchar" => (false, 14),
        "rmoveto" => (false, 21),
        "hmoveto" => (false, 22),
        "vhcurveto" => (false, 30),
        "hvcurveto" => (false, 31),
        "dotsection" => (true, 0),
        "vstem3" => (true, 1),
        "hstem3" => (true, 2),
        "seac" => (true, 6),
        "sbw" => (true, 7),
        "div" => (true, 12),
        "callothersubr" => (true, 16),
        "pop" => (true, 17),
        "setcurrentpoint" => (true, 33),
        _ => return None,
    })
}

fn type2_operator(name: &str) -> Option<(bool, u8)> {
    Some(match name {
        "hstem" => (false, 1),
        "vstem" => (false, 3),
        "vmoveto" => (false, 4),
        "rlineto" => (false, 5),
        "hlineto" => (false, 6),
        "vlineto" => (false, 7),
        "rrcurveto" => (false, 8),
        "callsubr" => (false, 10),
        "return" => (false, 11),
        "endchar" => (false, 14),
        "blend" => (false, 16),
        "hstemhm" => (false, 18),
        "hintmask" => (false, 19),
        "cntrmask" => (false, 20),
        "rmoveto" => (false, 21),
        "hmoveto" => (false, 22),
        "vstemhm" => (false, 23),
        "rcurveline" => (false, 24),
        "rlinecurve" => (false, 25),
        "vvcurveto" => (false, 26),
        "hhcurveto" => (false, 27),
        "callgsubr" => (false, 29),
        "vhcurveto" => (false, 30),
        "hvcurveto" => (false, 31),
        "dotsection" => (true, 0),
        "and" => (true, 3),
        "or" => (true, 4),
        "not" => (true, 5),
        "store" => (true, 8),
        "abs" => (true, 9),
        "add" => (true, 10),
        "sub" => (true, 11),
        "div" => (true, 12),
        "load" => (true, 13),
        "neg" => (true, 14),
        "eq" => (true, 15),
        "drop" => (true, 18),
        "put" => (true, 20),
        "get" => (true, 21),
        "ifelse" => (true, 22),
        "random" => (true, 23),
        "mul" => (true, 24),
        "sqrt" => (true, 26),
        "dup" => (true, 27),
        "exch" => (true, 28),
        "index" => (true, 29),
        "roll" => (true, 30),
        "hflex" => (true, 34),
        "flex" => (true, 35),
        "hflex1" => (true, 36),
        "flex1" => (true, 37),
        _ => return None,
    })
}
