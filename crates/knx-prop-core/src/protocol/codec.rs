//! Conversion between user entered literals and raw property data.
//!
//! Numbers typed by the user follow `Integer.decode` conventions (sign, `0x`,
//! `#`, leading zero for octal). Data literals for raw writes select their
//! representation by prefix and are serialized to minimal big-endian bytes,
//! except hex literals which map digit pairs to bytes directly.

use crate::error::ParseError;

/// Decode a possibly signed integer with radix prefix.
///
/// Accepts `0x`/`0X`/`#` for hexadecimal, a leading `0` for octal, decimal
/// otherwise.
pub fn decode_integer(text: &str) -> Result<i64, ParseError> {
    let invalid = || ParseError::InvalidNumber(text.to_string());

    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        Some(_) => (false, text),
        None => return Err(invalid()),
    };

    let (radix, digits) = if let Some(hex) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .or_else(|| rest.strip_prefix('#'))
    {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    let magnitude = parse_unsigned(digits, radix).ok_or_else(invalid)?;
    if negative {
        0i64.checked_sub_unsigned(magnitude).ok_or_else(invalid)
    } else {
        i64::try_from(magnitude).map_err(|_| invalid())
    }
}

/// Decode a number that must fit into `u16`, e.g. an object index or pid.
pub fn decode_u16(text: &str) -> Result<u16, ParseError> {
    let value = decode_integer(text)?;
    u16::try_from(value).map_err(|_| ParseError::OutOfRange(text.to_string()))
}

/// Parse a data literal of a raw property write into bytes.
///
/// Representation is chosen by prefix, in order: `0x`/`0X` hexadecimal, a
/// leading `0` octal, a leading `b` binary, decimal otherwise.
pub fn parse_byte_literal(text: &str) -> Result<Vec<u8>, ParseError> {
    let malformed = || ParseError::MalformedData(text.to_string());

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return parse_hex_digits(hex).ok_or_else(malformed);
    }

    let value = if text.len() > 1 && text.starts_with('0') {
        parse_unsigned(&text[1..], 8)
    } else if let Some(bits) = text.strip_prefix('b') {
        parse_unsigned(bits, 2)
    } else {
        parse_unsigned(text, 10)
    }
    .ok_or_else(malformed)?;

    Ok(minimal_be_bytes(value))
}

// An odd digit count gives the first byte the single leading nibble:
// "123" is [0x01, 0x23], not [0x12, 0x03]. Some devices rely on it.
fn parse_hex_digits(digits: &str) -> Option<Vec<u8>> {
    let first = *digits.as_bytes().first()?;
    if digits.len() % 2 == 0 {
        return hex::decode(digits).ok();
    }
    if !first.is_ascii_hexdigit() {
        return None;
    }
    let mut bytes = vec![u8::from_str_radix(&digits[..1], 16).ok()?];
    bytes.extend(hex::decode(&digits[1..]).ok()?);
    Some(bytes)
}

// from_str_radix would accept a sign, the callers handle signs themselves
fn parse_unsigned(digits: &str, radix: u32) -> Option<u64> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Serialize to the fewest big-endian bytes, at least one byte.
pub fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Lowercase hex pairs without separator.
pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Hex form of a single element, prefixed with `0x`.
pub fn format_hex_value(data: &[u8]) -> String {
    format!("0x{}", to_hex(data))
}

/// Hex form of `count` elements: equal width groups, each prefixed with `0x`,
/// joined by a single space.
///
/// Group width is the total number of hex digits divided by `count`; digits
/// left over by an uneven split stay with the last group.
pub fn format_hex_groups(data: &[u8], count: usize) -> String {
    let hex = to_hex(data);
    let count = count.max(1);
    let width = hex.len() / count;
    if width == 0 {
        return format!("0x{}", hex);
    }

    (0..count)
        .map(|i| {
            let start = i * width;
            let end = if i + 1 == count { hex.len() } else { start + width };
            format!("0x{}", &hex[start..end])
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integer_radix() {
        assert_eq!(decode_integer("42").unwrap(), 42);
        assert_eq!(decode_integer("0x1F").unwrap(), 31);
        assert_eq!(decode_integer("0X1f").unwrap(), 31);
        assert_eq!(decode_integer("#ff").unwrap(), 255);
        assert_eq!(decode_integer("017").unwrap(), 15);
        assert_eq!(decode_integer("0").unwrap(), 0);
        assert_eq!(decode_integer("-12").unwrap(), -12);
        assert_eq!(decode_integer("+7").unwrap(), 7);
    }

    #[test]
    fn test_decode_integer_invalid() {
        for text in ["", "-", "0x", "09", "abc", "0x-1", "1.5", "--1", "99999999999999999999"] {
            assert_eq!(
                decode_integer(text),
                Err(ParseError::InvalidNumber(text.to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn test_decode_u16_range() {
        assert_eq!(decode_u16("65535").unwrap(), 65535);
        assert_eq!(
            decode_u16("65536"),
            Err(ParseError::OutOfRange("65536".to_string()))
        );
        assert_eq!(decode_u16("-1"), Err(ParseError::OutOfRange("-1".to_string())));
    }

    #[test]
    fn test_decimal_literal_minimal_bytes() {
        assert_eq!(parse_byte_literal("0").unwrap(), vec![0x00]);
        assert_eq!(parse_byte_literal("255").unwrap(), vec![0xff]);
        assert_eq!(parse_byte_literal("256").unwrap(), vec![0x01, 0x00]);
        assert_eq!(parse_byte_literal("65536").unwrap(), vec![0x01, 0x00, 0x00]);
        assert_eq!(
            parse_byte_literal("18446744073709551615").unwrap(),
            vec![0xff; 8]
        );
    }

    #[test]
    fn test_octal_and_binary_literals() {
        assert_eq!(parse_byte_literal("0777").unwrap(), vec![0x01, 0xff]);
        assert_eq!(parse_byte_literal("00").unwrap(), vec![0x00]);
        assert_eq!(parse_byte_literal("b1").unwrap(), vec![0x01]);
        assert_eq!(parse_byte_literal("b100000000").unwrap(), vec![0x01, 0x00]);
    }

    #[test]
    fn test_hex_literal_keeps_leading_zero_bytes() {
        assert_eq!(parse_byte_literal("0x0001").unwrap(), vec![0x00, 0x01]);
        assert_eq!(parse_byte_literal("0XABcd").unwrap(), vec![0xab, 0xcd]);
    }

    // Historical quirk kept as is: the first byte of an odd-length hex literal
    // only holds one nibble.
    #[test]
    fn test_odd_hex_literal_first_byte_takes_one_nibble() {
        assert_eq!(parse_byte_literal("0x123").unwrap(), vec![0x01, 0x23]);
        assert_eq!(parse_byte_literal("0xf").unwrap(), vec![0x0f]);
        assert_eq!(parse_byte_literal("0x12345").unwrap(), vec![0x01, 0x23, 0x45]);
    }

    #[test]
    fn test_malformed_literals() {
        for text in ["0x", "0x12g4", "0x+1", "0xé1", "0xé", "b102", "08", "", "-5", "12a", "b"] {
            assert_eq!(
                parse_byte_literal(text),
                Err(ParseError::MalformedData(text.to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn test_hex_round_trip() {
        for data in [vec![0x00], vec![0x01, 0x00], vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x7f]] {
            let literal = format_hex_value(&data);
            assert_eq!(parse_byte_literal(&literal).unwrap(), data);
        }
    }

    #[test]
    fn test_format_hex_groups() {
        assert_eq!(format_hex_groups(&[0x00, 0x0a, 0x01, 0xff], 2), "0x000a 0x01ff");
        assert_eq!(format_hex_groups(&[0x12, 0x34], 1), "0x1234");
        assert_eq!(format_hex_groups(&[0x12, 0x34, 0x56], 3), "0x12 0x34 0x56");
    }

    #[test]
    fn test_format_hex_groups_uneven() {
        assert_eq!(format_hex_groups(&[0x12, 0x34, 0x56], 2), "0x123 0x456");
        assert_eq!(format_hex_groups(&[], 2), "0x");
        assert_eq!(format_hex_groups(&[0xab], 0), "0xab");
    }
}
