// SPDX-License-Identifier: Apache-2.0

//! Typed-field payload codec: `(field-name: zstring, type-tag: u8,
//! length: u32, bytes)` tuples, concatenated to form a frame's payload
//! (spec.md §4.1).

use std::convert::TryInto;

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("unknown field type tag {0}")]
    UnknownTag(u8),
    #[error("truncated field payload")]
    Truncated,
    #[error("field name is not valid UTF-8")]
    BadName,
    #[error("declared field length exceeds remaining payload")]
    LengthOverflow,
}

const TAG_STRING: u8 = 0;
const TAG_BYTES: u8 = 1;
const TAG_U8: u8 = 2;
const TAG_U16: u8 = 3;
const TAG_U32: u8 = 4;
const TAG_U64: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_SUBSTRUCTURE: u8 = 7;
/// Recursive sub-packet, e.g. a nested command embedded by a multiplexing
/// transport (spec.md §4.1: "sub-packet (recursive frame)").
const TAG_SUBPACKET: u8 = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Bytes(Vec<u8>),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Double(f64),
    Substructure(Vec<Field>),
    SubPacket(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::String(value.into()),
        }
    }

    pub fn bytes(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::Bytes(value.into()),
        }
    }

    pub fn u8(name: impl Into<String>, value: u8) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::U8(value),
        }
    }

    pub fn u16(name: impl Into<String>, value: u16) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::U16(value),
        }
    }

    pub fn u32(name: impl Into<String>, value: u32) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::U32(value),
        }
    }

    pub fn u64(name: impl Into<String>, value: u64) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::U64(value),
        }
    }

    pub fn double(name: impl Into<String>, value: f64) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::Double(value),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match &self.value {
            FieldValue::U32(v) => Some(*v),
            FieldValue::U16(v) => Some(*v as u32),
            FieldValue::U8(v) => Some(*v as u32),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.name.as_bytes());
        out.push(0); // zstring terminator

        let (tag, body) = match &self.value {
            FieldValue::String(s) => (TAG_STRING, s.as_bytes().to_vec()),
            FieldValue::Bytes(b) => (TAG_BYTES, b.clone()),
            FieldValue::U8(v) => (TAG_U8, vec![*v]),
            FieldValue::U16(v) => (TAG_U16, v.to_be_bytes().to_vec()),
            FieldValue::U32(v) => (TAG_U32, v.to_be_bytes().to_vec()),
            FieldValue::U64(v) => (TAG_U64, v.to_be_bytes().to_vec()),
            FieldValue::Double(v) => (TAG_DOUBLE, v.to_be_bytes().to_vec()),
            FieldValue::Substructure(fields) => {
                let mut inner = Vec::new();
                for f in fields {
                    f.encode_into(&mut inner);
                }
                (TAG_SUBSTRUCTURE, inner)
            }
            FieldValue::SubPacket(bytes) => (TAG_SUBPACKET, bytes.clone()),
        };

        out.push(tag);
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
    }
}

pub(crate) fn decode_all(mut payload: &[u8]) -> Result<Vec<Field>, FieldError> {
    let mut fields = Vec::new();
    while !payload.is_empty() {
        let (field, rest) = decode_one(payload)?;
        fields.push(field);
        payload = rest;
    }
    Ok(fields)
}

fn decode_one(payload: &[u8]) -> Result<(Field, &[u8]), FieldError> {
    let nul = payload
        .iter()
        .position(|&b| b == 0)
        .ok_or(FieldError::Truncated)?;
    let name = std::str::from_utf8(&payload[..nul])
        .map_err(|_| FieldError::BadName)?
        .to_string();
    let rest = &payload[nul + 1..];

    if rest.len() < 5 {
        return Err(FieldError::Truncated);
    }
    let tag = rest[0];
    let len = u32::from_be_bytes(rest[1..5].try_into().expect("slice is 4 bytes")) as usize;
    let rest = &rest[5..];
    if len > rest.len() {
        return Err(FieldError::LengthOverflow);
    }
    let body = &rest[..len];
    let remaining = &rest[len..];

    let value = match tag {
        TAG_STRING => FieldValue::String(
            std::str::from_utf8(body)
                .map_err(|_| FieldError::BadName)?
                .to_string(),
        ),
        TAG_BYTES => FieldValue::Bytes(body.to_vec()),
        TAG_U8 => FieldValue::U8(*body.first().ok_or(FieldError::Truncated)?),
        TAG_U16 => FieldValue::U16(u16::from_be_bytes(
            body.try_into().map_err(|_| FieldError::Truncated)?,
        )),
        TAG_U32 => FieldValue::U32(u32::from_be_bytes(
            body.try_into().map_err(|_| FieldError::Truncated)?,
        )),
        TAG_U64 => FieldValue::U64(u64::from_be_bytes(
            body.try_into().map_err(|_| FieldError::Truncated)?,
        )),
        TAG_DOUBLE => FieldValue::Double(f64::from_be_bytes(
            body.try_into().map_err(|_| FieldError::Truncated)?,
        )),
        TAG_SUBSTRUCTURE => FieldValue::Substructure(decode_all(body)?),
        TAG_SUBPACKET => FieldValue::SubPacket(body.to_vec()),
        other => return Err(FieldError::UnknownTag(other)),
    };

    Ok((Field { name, value }, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_scalar_fields() {
        let fields = vec![
            Field::string("driver", "pcapfile"),
            Field::u32("channel", 11),
            Field::bytes("payload", vec![1, 2, 3]),
            Field::double("lat", 40.7128),
        ];
        let mut buf = Vec::new();
        for f in &fields {
            f.encode_into(&mut buf);
        }
        let decoded = decode_all(&buf).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn roundtrips_nested_substructure() {
        let field = Field {
            name: "gps".to_string(),
            value: FieldValue::Substructure(vec![Field::double("lat", 1.0), Field::double("lon", 2.0)]),
        };
        let mut buf = Vec::new();
        field.encode_into(&mut buf);
        let decoded = decode_all(&buf).unwrap();
        assert_eq!(decoded, vec![field]);
    }

    #[test]
    fn rejects_length_overflow() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"x\0");
        buf.push(TAG_BYTES);
        buf.extend_from_slice(&100u32.to_be_bytes()); // declares far more than provided
        buf.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(decode_all(&buf), Err(FieldError::LengthOverflow)));
    }
}
