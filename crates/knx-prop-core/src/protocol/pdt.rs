//! KNX property data types (PDT) and value translation.
//!
//! Translation covers the fixed size numeric, text and bit types. Everything
//! else reports `ProtocolError::TranslationUnsupported` and callers fall back
//! to hex output.

use std::fmt;

use serde::Deserialize;

use crate::error::ProtocolError;
use crate::protocol::codec::decode_integer;

/// Property data type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Pdt(pub u8);

impl Pdt {
    pub const CONTROL: Pdt = Pdt(0x00);
    pub const CHAR: Pdt = Pdt(0x01);
    pub const UNSIGNED_CHAR: Pdt = Pdt(0x02);
    pub const INT: Pdt = Pdt(0x03);
    pub const UNSIGNED_INT: Pdt = Pdt(0x04);
    pub const KNX_FLOAT: Pdt = Pdt(0x05);
    pub const DATE: Pdt = Pdt(0x06);
    pub const TIME: Pdt = Pdt(0x07);
    pub const LONG: Pdt = Pdt(0x08);
    pub const UNSIGNED_LONG: Pdt = Pdt(0x09);
    pub const FLOAT: Pdt = Pdt(0x0a);
    pub const DOUBLE: Pdt = Pdt(0x0b);
    pub const CHAR_BLOCK: Pdt = Pdt(0x0c);
    pub const POLL_GROUP_SETTINGS: Pdt = Pdt(0x0d);
    pub const SHORT_CHAR_BLOCK: Pdt = Pdt(0x0e);
    pub const DATE_TIME: Pdt = Pdt(0x0f);
    pub const VARIABLE_LENGTH: Pdt = Pdt(0x10);
    pub const GENERIC_01: Pdt = Pdt(0x11);
    pub const GENERIC_20: Pdt = Pdt(0x24);
    pub const UTF8: Pdt = Pdt(0x2f);
    pub const VERSION: Pdt = Pdt(0x30);
    pub const ALARM_INFO: Pdt = Pdt(0x31);
    pub const BINARY_INFORMATION: Pdt = Pdt(0x32);
    pub const BITSET8: Pdt = Pdt(0x33);
    pub const BITSET16: Pdt = Pdt(0x34);
    pub const ENUM8: Pdt = Pdt(0x35);
    pub const SCALING: Pdt = Pdt(0x36);
    pub const NE_VL: Pdt = Pdt(0x3c);
    pub const NE_FL: Pdt = Pdt(0x3d);
    pub const FUNCTION: Pdt = Pdt(0x3e);
    pub const ESCAPE: Pdt = Pdt(0x3f);

    /// Size in bytes of one element, `None` for variable length types.
    pub fn element_size(self) -> Option<usize> {
        let size = match self {
            Pdt::CONTROL | Pdt::CHAR | Pdt::UNSIGNED_CHAR => 1,
            Pdt::INT | Pdt::UNSIGNED_INT | Pdt::KNX_FLOAT => 2,
            Pdt::DATE | Pdt::TIME | Pdt::POLL_GROUP_SETTINGS => 3,
            Pdt::LONG | Pdt::UNSIGNED_LONG | Pdt::FLOAT => 4,
            Pdt::DOUBLE | Pdt::DATE_TIME => 8,
            Pdt::CHAR_BLOCK => 10,
            Pdt::SHORT_CHAR_BLOCK => 5,
            Pdt(code @ 0x11..=0x24) => usize::from(code - 0x10),
            Pdt::VERSION => 2,
            Pdt::ALARM_INFO => 6,
            Pdt::BINARY_INFORMATION | Pdt::BITSET8 | Pdt::ENUM8 | Pdt::SCALING => 1,
            Pdt::BITSET16 => 2,
            _ => return None,
        };
        Some(size)
    }

    /// Symbolic name, e.g. `PDT_UNSIGNED_INT`.
    pub fn name(self) -> String {
        let name = match self {
            Pdt::CONTROL => "PDT_CONTROL",
            Pdt::CHAR => "PDT_CHAR",
            Pdt::UNSIGNED_CHAR => "PDT_UNSIGNED_CHAR",
            Pdt::INT => "PDT_INT",
            Pdt::UNSIGNED_INT => "PDT_UNSIGNED_INT",
            Pdt::KNX_FLOAT => "PDT_KNX_FLOAT",
            Pdt::DATE => "PDT_DATE",
            Pdt::TIME => "PDT_TIME",
            Pdt::LONG => "PDT_LONG",
            Pdt::UNSIGNED_LONG => "PDT_UNSIGNED_LONG",
            Pdt::FLOAT => "PDT_FLOAT",
            Pdt::DOUBLE => "PDT_DOUBLE",
            Pdt::CHAR_BLOCK => "PDT_CHAR_BLOCK",
            Pdt::POLL_GROUP_SETTINGS => "PDT_POLL_GROUP_SETTINGS",
            Pdt::SHORT_CHAR_BLOCK => "PDT_SHORT_CHAR_BLOCK",
            Pdt::DATE_TIME => "PDT_DATE_TIME",
            Pdt::VARIABLE_LENGTH => "PDT_VARIABLE_LENGTH",
            Pdt(code @ 0x11..=0x24) => return format!("PDT_GENERIC_{:02}", code - 0x10),
            Pdt::UTF8 => "PDT_UTF-8",
            Pdt::VERSION => "PDT_VERSION",
            Pdt::ALARM_INFO => "PDT_ALARM_INFO",
            Pdt::BINARY_INFORMATION => "PDT_BINARY_INFORMATION",
            Pdt::BITSET8 => "PDT_BITSET8",
            Pdt::BITSET16 => "PDT_BITSET16",
            Pdt::ENUM8 => "PDT_ENUM8",
            Pdt::SCALING => "PDT_SCALING",
            Pdt::NE_VL => "PDT_NE_VL",
            Pdt::NE_FL => "PDT_NE_FL",
            Pdt::FUNCTION => "PDT_FUNCTION",
            Pdt::ESCAPE => "PDT_ESCAPE",
            Pdt(code) => return format!("PDT_{:#04x}", code),
        };
        name.to_string()
    }
}

/// Printed as the numeric code, the way descriptions show it.
impl fmt::Display for Pdt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Translate raw data of `count` consecutive elements into display values.
pub fn format_elements(pdt: Pdt, data: &[u8], count: usize) -> Result<Vec<String>, ProtocolError> {
    let size = translatable_size(pdt)?;
    if data.len() != size * count {
        return Err(ProtocolError::DataLength {
            expected: size * count,
            actual: data.len(),
            count: count as u16,
        });
    }
    data.chunks(size).map(|element| format_element(pdt, element)).collect()
}

/// Translate one raw element into its display value.
pub fn format_element(pdt: Pdt, data: &[u8]) -> Result<String, ProtocolError> {
    let size = translatable_size(pdt)?;
    if data.len() != size {
        return Err(ProtocolError::DataLength {
            expected: size,
            actual: data.len(),
            count: 1,
        });
    }

    let value = match pdt {
        Pdt::CHAR => (data[0] as i8).to_string(),
        Pdt::UNSIGNED_CHAR | Pdt::ENUM8 => data[0].to_string(),
        Pdt::INT => i16::from_be_bytes([data[0], data[1]]).to_string(),
        Pdt::UNSIGNED_INT => u16::from_be_bytes([data[0], data[1]]).to_string(),
        Pdt::KNX_FLOAT => format!("{:.2}", decode_knx_float(u16::from_be_bytes([data[0], data[1]]))),
        Pdt::LONG => i32::from_be_bytes([data[0], data[1], data[2], data[3]]).to_string(),
        Pdt::UNSIGNED_LONG => u32::from_be_bytes([data[0], data[1], data[2], data[3]]).to_string(),
        Pdt::FLOAT => f32::from_be_bytes([data[0], data[1], data[2], data[3]]).to_string(),
        Pdt::DOUBLE => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(data);
            f64::from_be_bytes(raw).to_string()
        }
        Pdt::CHAR_BLOCK | Pdt::SHORT_CHAR_BLOCK => data
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect(),
        Pdt::BINARY_INFORMATION => (data[0] & 0x01 != 0).to_string(),
        Pdt::BITSET8 => format!("{:08b}", data[0]),
        Pdt::BITSET16 => format!("{:016b}", u16::from_be_bytes([data[0], data[1]])),
        Pdt::SCALING => format!("{}%", (u32::from(data[0]) * 100 + 127) / 255),
        Pdt::VERSION => {
            let v = u16::from_be_bytes([data[0], data[1]]);
            format!("{}.{}.{}", v >> 11, (v >> 6) & 0x1f, v & 0x3f)
        }
        _ => return Err(unsupported(pdt)),
    };
    Ok(value)
}

/// Encode a textual value into one raw element.
pub fn parse_value(pdt: Pdt, text: &str) -> Result<Vec<u8>, ProtocolError> {
    let invalid = || ProtocolError::InvalidValue {
        value: text.to_string(),
        pdt: pdt.name(),
    };
    let int = |min: i64, max: i64| -> Result<i64, ProtocolError> {
        decode_integer(text)
            .ok()
            .filter(|v| (min..=max).contains(v))
            .ok_or_else(invalid)
    };

    let data = match pdt {
        Pdt::CHAR => vec![int(i8::MIN.into(), i8::MAX.into())? as i8 as u8],
        Pdt::UNSIGNED_CHAR | Pdt::ENUM8 => vec![int(0, u8::MAX.into())? as u8],
        Pdt::INT => (int(i16::MIN.into(), i16::MAX.into())? as i16).to_be_bytes().to_vec(),
        Pdt::UNSIGNED_INT => (int(0, u16::MAX.into())? as u16).to_be_bytes().to_vec(),
        Pdt::KNX_FLOAT => {
            let value: f64 = text.trim().parse().map_err(|_| invalid())?;
            encode_knx_float(value).ok_or_else(invalid)?.to_be_bytes().to_vec()
        }
        Pdt::LONG => (int(i32::MIN.into(), i32::MAX.into())? as i32).to_be_bytes().to_vec(),
        Pdt::UNSIGNED_LONG => (int(0, u32::MAX.into())? as u32).to_be_bytes().to_vec(),
        Pdt::FLOAT => text
            .trim()
            .parse::<f32>()
            .map_err(|_| invalid())?
            .to_be_bytes()
            .to_vec(),
        Pdt::DOUBLE => text
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid())?
            .to_be_bytes()
            .to_vec(),
        Pdt::CHAR_BLOCK | Pdt::SHORT_CHAR_BLOCK => {
            let size = translatable_size(pdt)?;
            let mut block = Vec::with_capacity(size);
            for c in text.chars() {
                block.push(u8::try_from(u32::from(c)).map_err(|_| invalid())?);
            }
            if block.len() > size {
                return Err(invalid());
            }
            block.resize(size, 0);
            block
        }
        Pdt::BINARY_INFORMATION => match text.to_lowercase().as_str() {
            "1" | "true" | "on" => vec![1],
            "0" | "false" | "off" => vec![0],
            _ => return Err(invalid()),
        },
        Pdt::BITSET8 => vec![u8::from_str_radix(text, 2).map_err(|_| invalid())?],
        Pdt::BITSET16 => u16::from_str_radix(text, 2)
            .map_err(|_| invalid())?
            .to_be_bytes()
            .to_vec(),
        Pdt::SCALING => {
            let percent: f64 = text
                .trim()
                .trim_end_matches('%')
                .parse()
                .map_err(|_| invalid())?;
            if !(0.0..=100.0).contains(&percent) {
                return Err(invalid());
            }
            vec![(percent * 255.0 / 100.0).round() as u8]
        }
        Pdt::VERSION => {
            let parts: Vec<u16> = text
                .split('.')
                .map(|p| p.parse::<u16>().map_err(|_| invalid()))
                .collect::<Result<_, _>>()?;
            match *parts.as_slice() {
                [magic, version, revision] if magic < 32 && version < 32 && revision < 64 => {
                    ((magic << 11) | (version << 6) | revision).to_be_bytes().to_vec()
                }
                _ => return Err(invalid()),
            }
        }
        _ => return Err(unsupported(pdt)),
    };
    Ok(data)
}

fn translatable_size(pdt: Pdt) -> Result<usize, ProtocolError> {
    match pdt {
        Pdt::CHAR
        | Pdt::UNSIGNED_CHAR
        | Pdt::INT
        | Pdt::UNSIGNED_INT
        | Pdt::KNX_FLOAT
        | Pdt::LONG
        | Pdt::UNSIGNED_LONG
        | Pdt::FLOAT
        | Pdt::DOUBLE
        | Pdt::CHAR_BLOCK
        | Pdt::SHORT_CHAR_BLOCK
        | Pdt::BINARY_INFORMATION
        | Pdt::BITSET8
        | Pdt::BITSET16
        | Pdt::ENUM8
        | Pdt::SCALING
        | Pdt::VERSION => pdt.element_size().ok_or_else(|| unsupported(pdt)),
        _ => Err(unsupported(pdt)),
    }
}

fn unsupported(pdt: Pdt) -> ProtocolError {
    ProtocolError::TranslationUnsupported(pdt.name())
}

// 2-octet float: value = 0.01 * mantissa * 2^exponent, 11 bit two's
// complement mantissa, 4 bit exponent.
fn decode_knx_float(raw: u16) -> f64 {
    let exponent = i32::from((raw >> 11) & 0x0f);
    let mut mantissa = i32::from(raw & 0x07ff);
    if raw & 0x8000 != 0 {
        mantissa -= 0x0800;
    }
    0.01 * f64::from(mantissa) * f64::from(1u32 << exponent)
}

fn encode_knx_float(value: f64) -> Option<u16> {
    if !value.is_finite() {
        return None;
    }
    let scaled = value * 100.0;
    let mut exponent = 0u16;
    let mut mantissa = scaled.round() as i64;
    while !(-2048..=2047).contains(&mantissa) {
        exponent += 1;
        if exponent > 15 {
            return None;
        }
        mantissa = (scaled / f64::from(1u32 << exponent)).round() as i64;
    }
    let sign = if mantissa < 0 { 0x8000 } else { 0 };
    Some(sign | (exponent << 11) | (mantissa as u16 & 0x07ff))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(Pdt::UNSIGNED_INT.element_size(), Some(2));
        assert_eq!(Pdt::CHAR_BLOCK.element_size(), Some(10));
        assert_eq!(Pdt(0x15).element_size(), Some(5));
        assert_eq!(Pdt::GENERIC_20.element_size(), Some(20));
        assert_eq!(Pdt::VARIABLE_LENGTH.element_size(), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(Pdt::UNSIGNED_INT.name(), "PDT_UNSIGNED_INT");
        assert_eq!(Pdt::GENERIC_01.name(), "PDT_GENERIC_01");
        assert_eq!(Pdt(0x20).name(), "PDT_GENERIC_16");
        assert_eq!(Pdt(0x40).name(), "PDT_0x40");
        assert_eq!(Pdt::UNSIGNED_INT.to_string(), "4");
    }

    #[test]
    fn test_format_numeric() {
        assert_eq!(format_element(Pdt::CHAR, &[0xff]).unwrap(), "-1");
        assert_eq!(format_element(Pdt::UNSIGNED_CHAR, &[0xff]).unwrap(), "255");
        assert_eq!(format_element(Pdt::INT, &[0x80, 0x00]).unwrap(), "-32768");
        assert_eq!(format_element(Pdt::UNSIGNED_INT, &[0x00, 0x0b]).unwrap(), "11");
        assert_eq!(
            format_element(Pdt::UNSIGNED_LONG, &[0x00, 0x01, 0x00, 0x00]).unwrap(),
            "65536"
        );
        assert_eq!(
            format_element(Pdt::FLOAT, &1.5f32.to_be_bytes()).unwrap(),
            "1.5"
        );
    }

    #[test]
    fn test_knx_float() {
        assert_eq!(format_element(Pdt::KNX_FLOAT, &[0x0c, 0x33]).unwrap(), "21.50");
        assert_eq!(format_element(Pdt::KNX_FLOAT, &[0x87, 0x9c]).unwrap(), "-1.00");
        assert_eq!(parse_value(Pdt::KNX_FLOAT, "21.5").unwrap(), vec![0x0c, 0x33]);
        assert_eq!(parse_value(Pdt::KNX_FLOAT, "-1").unwrap(), vec![0x87, 0x9c]);
        assert!(parse_value(Pdt::KNX_FLOAT, "1e9").is_err());
        for text in ["NaN", "inf", "-inf"] {
            assert!(
                matches!(
                    parse_value(Pdt::KNX_FLOAT, text),
                    Err(ProtocolError::InvalidValue { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_text_blocks() {
        let data = parse_value(Pdt::CHAR_BLOCK, "KNX dev").unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(format_element(Pdt::CHAR_BLOCK, &data).unwrap(), "KNX dev");
        assert!(parse_value(Pdt::SHORT_CHAR_BLOCK, "too long").is_err());
    }

    #[test]
    fn test_bits_and_scaling() {
        assert_eq!(format_element(Pdt::BINARY_INFORMATION, &[1]).unwrap(), "true");
        assert_eq!(parse_value(Pdt::BINARY_INFORMATION, "off").unwrap(), vec![0]);
        assert_eq!(format_element(Pdt::BITSET8, &[0x05]).unwrap(), "00000101");
        assert_eq!(parse_value(Pdt::BITSET16, "100000001").unwrap(), vec![0x01, 0x01]);
        assert_eq!(format_element(Pdt::SCALING, &[0xff]).unwrap(), "100%");
        assert_eq!(parse_value(Pdt::SCALING, "50%").unwrap(), vec![128]);
    }

    #[test]
    fn test_version() {
        let data = parse_value(Pdt::VERSION, "1.2.3").unwrap();
        assert_eq!(data, vec![0x08, 0x83]);
        assert_eq!(format_element(Pdt::VERSION, &data).unwrap(), "1.2.3");
        assert!(parse_value(Pdt::VERSION, "1.2").is_err());
    }

    #[test]
    fn test_parse_range_checked() {
        assert_eq!(parse_value(Pdt::UNSIGNED_INT, "0x1234").unwrap(), vec![0x12, 0x34]);
        assert!(matches!(
            parse_value(Pdt::UNSIGNED_CHAR, "256"),
            Err(ProtocolError::InvalidValue { .. })
        ));
        assert!(parse_value(Pdt::INT, "-32769").is_err());
    }

    #[test]
    fn test_format_elements() {
        let values = format_elements(Pdt::UNSIGNED_INT, &[0, 1, 0, 2], 2).unwrap();
        assert_eq!(values, vec!["1", "2"]);
        assert!(matches!(
            format_elements(Pdt::UNSIGNED_INT, &[0, 1, 0], 2),
            Err(ProtocolError::DataLength { .. })
        ));
    }

    #[test]
    fn test_unsupported_translation() {
        assert!(matches!(
            format_element(Pdt::GENERIC_01, &[0]),
            Err(ProtocolError::TranslationUnsupported(name)) if name == "PDT_GENERIC_01"
        ));
        assert!(matches!(
            parse_value(Pdt::DATE, "2024-01-01"),
            Err(ProtocolError::TranslationUnsupported(_))
        ));
    }
}
