/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Dictionary payload codec.
//!
//! A payload is one framed tag=value message. Field dictionaries use message
//! type `DF` with a repeating group of field entries; enum dictionaries use
//! `DE` with nested groups of referencing field ids and coded values.

use crate::schema::{EnumTable, FieldDef, RwfType};
use bytes::Bytes;
use mdict_core::error::{DecodeError, EncodeError};
use mdict_core::field::FieldRef;
use mdict_core::types::DictionaryType;
use mdict_tagvalue::{Decoder, Encoder};

/// BeginString of dictionary payload frames.
pub const PAYLOAD_BEGIN_STRING: &str = "MDICT.1.0";

/// Message type of a field definitions payload.
pub const MSG_FIELD_DEFINITIONS: &str = "DF";
/// Message type of an enum tables payload.
pub const MSG_ENUM_TABLES: &str = "DE";

/// Payload field tags.
pub mod tags {
    /// Dictionary name.
    pub const NAME: u32 = 21;
    /// Dictionary version.
    pub const VERSION: u32 = 23;
    /// Number of field entries.
    pub const NO_FIELDS: u32 = 300;
    /// Field id.
    pub const FID: u32 = 301;
    /// Field acronym.
    pub const ACRONYM: u32 = 302;
    /// Field wire type.
    pub const RWF_TYPE: u32 = 303;
    /// Field max length.
    pub const LENGTH: u32 = 304;
    /// Number of enum tables.
    pub const NO_TABLES: u32 = 400;
    /// Number of field ids referencing a table.
    pub const NO_TABLE_FIDS: u32 = 401;
    /// Referencing field id.
    pub const TABLE_FID: u32 = 402;
    /// Number of coded values in a table.
    pub const NO_VALUES: u32 = 403;
    /// Coded value.
    pub const VALUE: u32 = 404;
    /// Display text of a coded value.
    pub const DISPLAY: u32 = 405;
}

/// Decoded content of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadContent {
    /// Field definitions.
    FieldDefinitions(Vec<FieldDef>),
    /// Enum tables.
    EnumTables(Vec<EnumTable>),
}

/// A decoded dictionary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Dictionary name carried in the payload.
    pub name: String,
    /// Dictionary version carried in the payload.
    pub version: String,
    /// Decoded content.
    pub content: PayloadContent,
}

/// Encodes field definitions as a payload.
///
/// # Errors
/// Returns `EncodeError` if a field cannot be encoded.
pub fn encode_field_definitions(
    name: &str,
    version: &str,
    defs: &[FieldDef],
) -> Result<Bytes, EncodeError> {
    let mut encoder = Encoder::new(PAYLOAD_BEGIN_STRING);
    encoder.put_str(35, MSG_FIELD_DEFINITIONS)?;
    encoder.put_str(tags::NAME, name)?;
    encoder.put_str(tags::VERSION, version)?;
    encoder.put_uint(tags::NO_FIELDS, defs.len() as u64)?;
    for def in defs {
        encoder.put_int(tags::FID, i64::from(def.fid))?;
        encoder.put_str(tags::ACRONYM, &def.acronym)?;
        encoder.put_str(tags::RWF_TYPE, def.rwf_type.as_str())?;
        encoder.put_uint(tags::LENGTH, u64::from(def.length))?;
    }
    Ok(encoder.finish()?.freeze())
}

/// Encodes enum tables as a payload.
///
/// # Errors
/// Returns `EncodeError` if a field cannot be encoded.
pub fn encode_enum_tables(
    name: &str,
    version: &str,
    tables: &[EnumTable],
) -> Result<Bytes, EncodeError> {
    let mut encoder = Encoder::new(PAYLOAD_BEGIN_STRING);
    encoder.put_str(35, MSG_ENUM_TABLES)?;
    encoder.put_str(tags::NAME, name)?;
    encoder.put_str(tags::VERSION, version)?;
    encoder.put_uint(tags::NO_TABLES, tables.len() as u64)?;
    for table in tables {
        encoder.put_uint(tags::NO_TABLE_FIDS, table.fids.len() as u64)?;
        for &fid in &table.fids {
            encoder.put_int(tags::TABLE_FID, i64::from(fid))?;
        }
        encoder.put_uint(tags::NO_VALUES, table.values.len() as u64)?;
        for (value, display) in &table.values {
            encoder.put_uint(tags::VALUE, u64::from(*value))?;
            encoder.put_str(tags::DISPLAY, display)?;
        }
    }
    Ok(encoder.finish()?.freeze())
}

/// Decodes a payload of the given dictionary type.
///
/// # Errors
/// Returns `DecodeError` if the frame is malformed, of the wrong type, or a
/// group is shorter than its declared count.
pub fn decode(kind: DictionaryType, payload: &[u8]) -> Result<DecodedPayload, DecodeError> {
    let frame = Decoder::new(payload).decode()?;
    let expected = match kind {
        DictionaryType::FieldDefinitions => MSG_FIELD_DEFINITIONS,
        DictionaryType::EnumTables => MSG_ENUM_TABLES,
    };
    frame.expect_msg_type(expected)?;

    let mut cursor = Cursor::new(frame.field_slice());
    let name = cursor.take(tags::NAME)?.as_str()?.to_owned();
    let version = cursor.take(tags::VERSION)?.as_str()?.to_owned();

    let content = match kind {
        DictionaryType::FieldDefinitions => {
            PayloadContent::FieldDefinitions(decode_field_definitions(&mut cursor)?)
        }
        DictionaryType::EnumTables => PayloadContent::EnumTables(decode_enum_tables(&mut cursor)?),
    };

    Ok(DecodedPayload {
        name,
        version,
        content,
    })
}

fn decode_field_definitions(cursor: &mut Cursor<'_, '_>) -> Result<Vec<FieldDef>, DecodeError> {
    let count: u32 = cursor.take(tags::NO_FIELDS)?.parse()?;
    let mut defs = Vec::with_capacity(count as usize);
    for index in 0..count {
        if cursor.is_done() {
            return Err(DecodeError::GroupCountMismatch {
                count_tag: tags::NO_FIELDS,
                expected: count,
                actual: index,
            });
        }
        let fid: i16 = cursor.take(tags::FID)?.parse()?;
        let acronym = cursor.take(tags::ACRONYM)?.as_str()?.to_owned();
        let rwf_type: RwfType = cursor.take(tags::RWF_TYPE)?.parse()?;
        let length: u16 = cursor.take(tags::LENGTH)?.parse()?;
        defs.push(FieldDef::new(fid, acronym, rwf_type).with_length(length));
    }
    Ok(defs)
}

fn decode_enum_tables(cursor: &mut Cursor<'_, '_>) -> Result<Vec<EnumTable>, DecodeError> {
    let count: u32 = cursor.take(tags::NO_TABLES)?.parse()?;
    let mut tables = Vec::with_capacity(count as usize);
    for index in 0..count {
        if cursor.is_done() {
            return Err(DecodeError::GroupCountMismatch {
                count_tag: tags::NO_TABLES,
                expected: count,
                actual: index,
            });
        }
        let mut table = EnumTable::new();
        let fid_count: u32 = cursor.take(tags::NO_TABLE_FIDS)?.parse()?;
        for _ in 0..fid_count {
            table.fids.push(cursor.take(tags::TABLE_FID)?.parse()?);
        }
        let value_count: u32 = cursor.take(tags::NO_VALUES)?.parse()?;
        for _ in 0..value_count {
            let value: u16 = cursor.take(tags::VALUE)?.parse()?;
            let display = cursor.take(tags::DISPLAY)?.as_str()?.to_owned();
            table.values.insert(value, display);
        }
        tables.push(table);
    }
    Ok(tables)
}

/// Sequential reader over a frame's body fields.
struct Cursor<'f, 'a> {
    fields: &'f [FieldRef<'a>],
    pos: usize,
}

impl<'f, 'a> Cursor<'f, 'a> {
    fn new(fields: &'f [FieldRef<'a>]) -> Self {
        Self { fields, pos: 0 }
    }

    fn take(&mut self, tag: u32) -> Result<FieldRef<'a>, DecodeError> {
        match self.fields.get(self.pos) {
            Some(field) if field.tag == tag => {
                self.pos += 1;
                Ok(*field)
            }
            _ => Err(DecodeError::MissingRequiredField { tag }),
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_definitions_payload() {
        let defs = vec![
            FieldDef::new(22, "BID", RwfType::Real).with_length(17),
            FieldDef::new(-1, "PROD_PERM", RwfType::UInt),
        ];
        let payload = encode_field_definitions("RWFFld", "4.20", &defs).unwrap();

        let decoded = decode(DictionaryType::FieldDefinitions, &payload).unwrap();
        assert_eq!(decoded.name, "RWFFld");
        assert_eq!(decoded.version, "4.20");
        assert_eq!(decoded.content, PayloadContent::FieldDefinitions(defs));
    }

    #[test]
    fn test_enum_tables_payload_with_empty_version() {
        let tables = vec![
            EnumTable::new()
                .with_fid(4)
                .with_fid(5)
                .with_value(0, "")
                .with_value(2, "NYS"),
        ];
        let payload = encode_enum_tables("RWFEnum", "", &tables).unwrap();

        let decoded = decode(DictionaryType::EnumTables, &payload).unwrap();
        assert_eq!(decoded.version, "");
        assert_eq!(decoded.content, PayloadContent::EnumTables(tables));
    }

    #[test]
    fn test_decode_wrong_kind() {
        let payload = encode_field_definitions("RWFFld", "1", &[]).unwrap();
        assert!(matches!(
            decode(DictionaryType::EnumTables, &payload),
            Err(DecodeError::UnexpectedMsgType { .. })
        ));
    }

    #[test]
    fn test_decode_short_group() {
        let mut encoder = Encoder::new(PAYLOAD_BEGIN_STRING);
        encoder.put_str(35, MSG_FIELD_DEFINITIONS).unwrap();
        encoder.put_str(tags::NAME, "RWFFld").unwrap();
        encoder.put_str(tags::VERSION, "1").unwrap();
        encoder.put_uint(tags::NO_FIELDS, 2).unwrap();
        encoder.put_int(tags::FID, 22).unwrap();
        encoder.put_str(tags::ACRONYM, "BID").unwrap();
        encoder.put_str(tags::RWF_TYPE, "REAL").unwrap();
        encoder.put_uint(tags::LENGTH, 0).unwrap();
        let payload = encoder.finish().unwrap();

        assert!(matches!(
            decode(DictionaryType::FieldDefinitions, &payload),
            Err(DecodeError::GroupCountMismatch {
                count_tag: tags::NO_FIELDS,
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode(DictionaryType::FieldDefinitions, b"not a payload").is_err());
    }
}
