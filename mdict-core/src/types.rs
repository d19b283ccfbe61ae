/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Core types for dictionary management.
//!
//! This module provides fundamental types used throughout MDict:
//! - [`DictionaryIdentity`]: Immutable cache key naming one dictionary payload
//! - [`DictionaryType`]: Field definitions or enumeration tables
//! - [`Filter`]: How much of a dictionary a consumer asked for
//! - [`SessionHandle`] and [`StreamId`]: Consumer and upstream handles
//! - [`Status`]: Upstream stream/data state report

use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of content a dictionary carries.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    FromPrimitive,
    ToPrimitive,
)]
#[repr(i32)]
pub enum DictionaryType {
    /// Field definitions (field id, acronym, data type).
    FieldDefinitions = 1,
    /// Enumeration tables mapping coded values to display text.
    EnumTables = 2,
}

impl DictionaryType {
    /// Returns the wire code of this dictionary type.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Resolves a wire code to a dictionary type.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        num_traits::FromPrimitive::from_i32(code)
    }
}

impl fmt::Display for DictionaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldDefinitions => write!(f, "FIELD_DEFINITIONS"),
            Self::EnumTables => write!(f, "ENUM_TABLES"),
        }
    }
}

/// Identity of one dictionary payload.
///
/// Equality and hashing cover all four components; this is the only key
/// under which payloads are cached. The type is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DictionaryIdentity {
    name: String,
    version: String,
    kind: DictionaryType,
    id: i32,
}

impl DictionaryIdentity {
    /// Creates a new dictionary identity.
    ///
    /// # Arguments
    /// * `name` - Dictionary name (e.g., "RWFFld")
    /// * `version` - Dictionary version string, may be empty
    /// * `kind` - Field definitions or enum tables
    /// * `id` - Dictionary id assigned by the provider
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        kind: DictionaryType,
        id: i32,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kind,
            id,
        }
    }

    /// Returns the dictionary name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dictionary version.
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the dictionary type.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> DictionaryType {
        self.kind
    }

    /// Returns the dictionary id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }
}

impl fmt::Display for DictionaryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[v={},{},id={}]",
            self.name, self.version, self.kind, self.id
        )
    }
}

/// Amount of dictionary content a consumer requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Filter {
    /// Identity summary only.
    Info,
    /// Complete dictionary content.
    #[default]
    Full,
}

impl Filter {
    /// Returns the wire text of this filter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Full => "FULL",
        }
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "FULL" => Ok(Self::Full),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle identifying one consumer request session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SessionHandle(u64);

impl SessionHandle {
    /// Creates a session handle from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw handle value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one upstream request stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct StreamId(u64);

impl StreamId {
    /// Creates a stream id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw stream id value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of an upstream stream.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
pub enum StreamState {
    /// Stream is open and will receive updates.
    Open = 1,
    /// Request was satisfied and the stream is not kept open.
    NonStreaming = 2,
    /// Stream closed; the request may be retried later.
    ClosedRecover = 3,
    /// Stream closed permanently.
    Closed = 4,
    /// Stream was redirected elsewhere.
    Redirected = 5,
}

impl StreamState {
    /// Returns the wire code of this stream state.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a wire code to a stream state.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        num_traits::FromPrimitive::from_u8(code)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "Open",
            Self::NonStreaming => "NonStreaming",
            Self::ClosedRecover => "ClosedRecover",
            Self::Closed => "Closed",
            Self::Redirected => "Redirected",
        };
        f.write_str(s)
    }
}

/// Health of the data carried on a stream.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    FromPrimitive,
    ToPrimitive,
)]
#[repr(u8)]
pub enum DataState {
    /// Data is good.
    Ok = 1,
    /// Data may be stale.
    #[default]
    Suspect = 2,
}

impl DataState {
    /// Returns the wire code of this data state.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Status reported by upstream for one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Stream state.
    pub stream_state: StreamState,
    /// Data state.
    pub data_state: DataState,
    /// Numeric status code, 0 when none.
    pub code: u32,
    /// Free-form status text.
    pub text: String,
}

impl Status {
    /// Creates a new status.
    #[must_use]
    pub fn new(stream_state: StreamState, data_state: DataState, text: impl Into<String>) -> Self {
        Self {
            stream_state,
            data_state,
            code: 0,
            text: text.into(),
        }
    }

    /// Creates a closed-recoverable, suspect status with the given text.
    #[must_use]
    pub fn closed_recover(text: impl Into<String>) -> Self {
        Self::new(StreamState::ClosedRecover, DataState::Suspect, text)
    }

    /// Sets the status code.
    #[must_use]
    pub const fn with_code(mut self, code: u32) -> Self {
        self.code = code;
        self
    }

    /// Returns true if the stream is still open after this status.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.stream_state, StreamState::Open)
    }
}
