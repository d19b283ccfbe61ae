/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Decoded dictionary schema.
//!
//! This module defines the structures a fetched payload decodes into:
//! - [`RwfType`]: Wire data type of a field
//! - [`FieldDef`]: One field definition (id, acronym, type, length)
//! - [`EnumTable`]: Coded values shared by one or more fields
//! - [`Schema`]: Per-service accumulator merging field and enum dictionaries

use crate::payload::{self, PayloadContent};
use mdict_core::error::DecodeError;
use mdict_core::types::{DictionaryIdentity, DictionaryType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Wire data type of a market-data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RwfType {
    /// Signed integer.
    Int,
    /// Unsigned integer.
    UInt,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Scaled decimal.
    Real,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    DateTime,
    /// Quality of service.
    Qos,
    /// Stream/data state.
    State,
    /// Enumerated value resolved through an enum table.
    Enum,
    /// Array of primitives.
    Array,
    /// Opaque bytes.
    Buffer,
    /// ASCII string.
    AsciiString,
    /// UTF-8 string.
    Utf8String,
    /// RMTES-encoded string.
    RmtesString,
}

impl RwfType {
    /// Returns the dictionary file name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::UInt => "UINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Real => "REAL",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATETIME",
            Self::Qos => "QOS",
            Self::State => "STATE",
            Self::Enum => "ENUM",
            Self::Array => "ARRAY",
            Self::Buffer => "BUFFER",
            Self::AsciiString => "ASCII_STRING",
            Self::Utf8String => "UTF8_STRING",
            Self::RmtesString => "RMTES_STRING",
        }
    }

    /// Returns true if this type represents a numeric value.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::UInt | Self::Float | Self::Double | Self::Real
        )
    }

    /// Returns true if this type represents a string.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(
            self,
            Self::AsciiString | Self::Utf8String | Self::RmtesString
        )
    }
}

impl std::str::FromStr for RwfType {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to [`RwfType::Buffer`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "INT" | "INT64" => Self::Int,
            "UINT" | "UINT64" => Self::UInt,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "REAL" | "REAL64" => Self::Real,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "DATETIME" => Self::DateTime,
            "QOS" => Self::Qos,
            "STATE" => Self::State,
            "ENUM" => Self::Enum,
            "ARRAY" => Self::Array,
            "ASCII_STRING" => Self::AsciiString,
            "UTF8_STRING" => Self::Utf8String,
            "RMTES_STRING" => Self::RmtesString,
            _ => Self::Buffer,
        })
    }
}

impl std::fmt::Display for RwfType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of one market-data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field id.
    pub fid: i16,
    /// Field acronym (e.g., "BID").
    pub acronym: String,
    /// Wire data type.
    pub rwf_type: RwfType,
    /// Maximum encoded length, 0 when unbounded.
    pub length: u16,
}

impl FieldDef {
    /// Creates a new field definition.
    ///
    /// # Arguments
    /// * `fid` - The field id
    /// * `acronym` - The field acronym
    /// * `rwf_type` - The wire data type
    #[must_use]
    pub fn new(fid: i16, acronym: impl Into<String>, rwf_type: RwfType) -> Self {
        Self {
            fid,
            acronym: acronym.into(),
            rwf_type,
            length: 0,
        }
    }

    /// Sets the maximum encoded length.
    #[must_use]
    pub const fn with_length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }
}

/// Enumeration table shared by one or more fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumTable {
    /// Field ids that reference this table.
    pub fids: Vec<i16>,
    /// Display text indexed by coded value.
    pub values: BTreeMap<u16, String>,
}

impl EnumTable {
    /// Creates an empty enum table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a referencing field id.
    #[must_use]
    pub fn with_fid(mut self, fid: i16) -> Self {
        self.fids.push(fid);
        self
    }

    /// Adds a coded value and its display text.
    #[must_use]
    pub fn with_value(mut self, value: u16, display: impl Into<String>) -> Self {
        self.values.insert(value, display.into());
        self
    }

    /// Returns the display text for a coded value.
    #[must_use]
    pub fn display(&self, value: u16) -> Option<&str> {
        self.values.get(&value).map(String::as_str)
    }
}

/// Decoded schema accumulated for one service.
///
/// Each dictionary identity is merged at most once; repeated merges of an
/// identity that is already present are no-ops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: HashMap<i16, FieldDef>,
    fields_by_acronym: HashMap<String, i16>,
    enum_tables: Vec<EnumTable>,
    enum_by_fid: HashMap<i16, usize>,
    field_version: Option<String>,
    enum_version: Option<String>,
    merged: HashSet<DictionaryIdentity>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `payload` and merges it, unless `identity` was merged before.
    ///
    /// # Returns
    /// `true` if the payload was merged by this call, `false` if it was already present.
    ///
    /// # Errors
    /// Returns `DecodeError` if the payload does not decode as `identity`'s type.
    pub fn merge(
        &mut self,
        identity: &DictionaryIdentity,
        payload: &[u8],
    ) -> Result<bool, DecodeError> {
        if self.merged.contains(identity) {
            return Ok(false);
        }

        let decoded = payload::decode(identity.kind(), payload)?;
        match decoded.content {
            PayloadContent::FieldDefinitions(defs) => {
                for def in defs {
                    self.add_field(def);
                }
                self.field_version = Some(decoded.version);
            }
            PayloadContent::EnumTables(tables) => {
                for table in tables {
                    self.add_enum_table(table);
                }
                self.enum_version = Some(decoded.version);
            }
        }
        self.merged.insert(identity.clone());
        Ok(true)
    }

    /// Adds a field definition.
    pub fn add_field(&mut self, field: FieldDef) {
        self.fields_by_acronym.insert(field.acronym.clone(), field.fid);
        self.fields.insert(field.fid, field);
    }

    /// Adds an enum table, indexing it by every referencing field id.
    pub fn add_enum_table(&mut self, table: EnumTable) {
        let index = self.enum_tables.len();
        for &fid in &table.fids {
            self.enum_by_fid.insert(fid, index);
        }
        self.enum_tables.push(table);
    }

    /// Gets a field definition by id.
    #[must_use]
    pub fn get_field(&self, fid: i16) -> Option<&FieldDef> {
        self.fields.get(&fid)
    }

    /// Gets a field definition by acronym.
    #[must_use]
    pub fn get_field_by_acronym(&self, acronym: &str) -> Option<&FieldDef> {
        self.fields_by_acronym
            .get(acronym)
            .and_then(|fid| self.fields.get(fid))
    }

    /// Gets the enum table used by a field.
    #[must_use]
    pub fn enum_table_for(&self, fid: i16) -> Option<&EnumTable> {
        self.enum_by_fid
            .get(&fid)
            .and_then(|&index| self.enum_tables.get(index))
    }

    /// Returns the number of field definitions.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the number of enum tables.
    #[must_use]
    pub fn enum_table_count(&self) -> usize {
        self.enum_tables.len()
    }

    /// Returns the version of the merged field dictionary.
    #[must_use]
    pub fn field_version(&self) -> Option<&str> {
        self.field_version.as_deref()
    }

    /// Returns the version of the merged enum dictionary.
    #[must_use]
    pub fn enum_version(&self) -> Option<&str> {
        self.enum_version.as_deref()
    }

    /// Returns true if `identity` has been merged.
    #[must_use]
    pub fn has_merged(&self, identity: &DictionaryIdentity) -> bool {
        self.merged.contains(identity)
    }

    /// Returns true if a dictionary of the given type has been merged.
    #[must_use]
    pub fn has_kind(&self, kind: DictionaryType) -> bool {
        self.merged.iter().any(|id| id.kind() == kind)
    }

    /// Returns true once both field definitions and enum tables are merged.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.has_kind(DictionaryType::FieldDefinitions) && self.has_kind(DictionaryType::EnumTables)
    }

    /// Returns an iterator over all field definitions.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{encode_enum_tables, encode_field_definitions};

    fn field_identity() -> DictionaryIdentity {
        DictionaryIdentity::new("RWFFld", "4.20", DictionaryType::FieldDefinitions, 1)
    }

    fn enum_identity() -> DictionaryIdentity {
        DictionaryIdentity::new("RWFEnum", "17.91", DictionaryType::EnumTables, 1)
    }

    #[test]
    fn test_rwf_type_from_str() {
        assert_eq!("INT".parse::<RwfType>().unwrap(), RwfType::Int);
        assert_eq!("real64".parse::<RwfType>().unwrap(), RwfType::Real);
        assert_eq!(
            "RMTES_STRING".parse::<RwfType>().unwrap(),
            RwfType::RmtesString
        );
        assert_eq!("unknown".parse::<RwfType>().unwrap(), RwfType::Buffer);
    }

    #[test]
    fn test_rwf_type_predicates() {
        assert!(RwfType::Real.is_numeric());
        assert!(!RwfType::Enum.is_numeric());
        assert!(RwfType::AsciiString.is_string());
    }

    #[test]
    fn test_schema_merge_once() {
        let payload = encode_field_definitions(
            "RWFFld",
            "4.20",
            &[
                FieldDef::new(22, "BID", RwfType::Real),
                FieldDef::new(25, "ASK", RwfType::Real),
            ],
        )
        .unwrap();
        let mut schema = Schema::new();

        assert!(schema.merge(&field_identity(), &payload).unwrap());
        assert!(!schema.merge(&field_identity(), &payload).unwrap());
        assert_eq!(schema.field_count(), 2);
        assert_eq!(schema.get_field_by_acronym("ASK").unwrap().fid, 25);
        assert_eq!(schema.field_version(), Some("4.20"));
        assert!(!schema.is_complete());
    }

    #[test]
    fn test_schema_complete_after_both_kinds() {
        let fields = encode_field_definitions(
            "RWFFld",
            "4.20",
            &[FieldDef::new(4, "RDN_EXCHID", RwfType::Enum)],
        )
        .unwrap();
        let enums = encode_enum_tables(
            "RWFEnum",
            "17.91",
            &[EnumTable::new()
                .with_fid(4)
                .with_value(0, "   ")
                .with_value(1, "ASE")],
        )
        .unwrap();
        let mut schema = Schema::new();
        schema.merge(&field_identity(), &fields).unwrap();
        schema.merge(&enum_identity(), &enums).unwrap();

        assert!(schema.is_complete());
        assert_eq!(schema.enum_table_for(4).unwrap().display(1), Some("ASE"));
        assert_eq!(schema.enum_version(), Some("17.91"));
    }

    #[test]
    fn test_schema_merge_rejects_wrong_kind() {
        let enums = encode_enum_tables("RWFEnum", "1", &[]).unwrap();
        let mut schema = Schema::new();
        assert!(schema.merge(&field_identity(), &enums).is_err());
        assert!(!schema.has_merged(&field_identity()));
    }
}
