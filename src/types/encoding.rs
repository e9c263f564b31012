//! Character set handling for text columns.
//!
//! A connection picks one [`EncodingStrategy`] when it is attached and keeps
//! it for its lifetime. The charset-aware strategy is built from a single
//! read of `RDB$CHARACTER_SETS`.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

use crate::native::constants::{FB_CHARSET_NONE, FB_CHARSET_OCTETS};
use crate::types::Value;

/// Catalog query listing the character sets known to the database.
pub const CHARACTER_SETS_SQL: &str =
    "SELECT RDB$CHARACTER_SET_NAME, RDB$CHARACTER_SET_ID FROM RDB$CHARACTER_SETS";

/// How text column bytes become values.
pub trait EncodingStrategy: Send + Sync + fmt::Debug {
    /// Decode CHAR/VARCHAR bytes stored in character set `charset_id`.
    fn decode(&self, bytes: Bytes, charset_id: i16) -> Value;
}

/// Treats all text as UTF-8, replacing invalid sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl EncodingStrategy for PassThrough {
    fn decode(&self, bytes: Bytes, _charset_id: i16) -> Value {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Character sets the core can decode natively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Latin1,
    Ascii,
    Octets,
    /// Known to the database but decoded lossily as UTF-8.
    Other(String),
}

impl Charset {
    /// Classify a catalog character set name (blank padding allowed).
    pub fn from_name(name: &str) -> Self {
        match name.trim_end() {
            "UTF8" | "UNICODE_FSS" => Charset::Utf8,
            "ISO8859_1" => Charset::Latin1,
            "NONE" | "ASCII" => Charset::Ascii,
            "OCTETS" | "BINARY" => Charset::Octets,
            other => Charset::Other(other.to_string()),
        }
    }
}

/// Decodes text according to the column's declared character set.
#[derive(Debug, Clone, Default)]
pub struct CharsetAware {
    charsets: HashMap<i16, Charset>,
}

impl CharsetAware {
    /// Build from `(name, id)` pairs read from the catalog.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i16)>,
        S: AsRef<str>,
    {
        let charsets = entries
            .into_iter()
            .map(|(name, id)| (id, Charset::from_name(name.as_ref())))
            .collect();
        Self { charsets }
    }

    /// Character set registered for an id.
    pub fn charset(&self, id: i16) -> Option<&Charset> {
        self.charsets.get(&id)
    }

    pub fn len(&self) -> usize {
        self.charsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charsets.is_empty()
    }
}

impl EncodingStrategy for CharsetAware {
    fn decode(&self, bytes: Bytes, charset_id: i16) -> Value {
        let charset = match self.charsets.get(&charset_id) {
            Some(c) => c,
            None if charset_id == FB_CHARSET_OCTETS => &Charset::Octets,
            None if charset_id == FB_CHARSET_NONE => &Charset::Ascii,
            None => {
                tracing::debug!("no character set registered for id {}", charset_id);
                return PassThrough.decode(bytes, charset_id);
            }
        };
        match charset {
            Charset::Octets => Value::Binary(bytes),
            // ISO8859_1 code points coincide with the first 256 of Unicode.
            Charset::Latin1 => Value::String(bytes.iter().map(|&b| char::from(b)).collect()),
            Charset::Utf8 | Charset::Ascii => PassThrough.decode(bytes, charset_id),
            Charset::Other(name) => {
                tracing::trace!("decoding {} text as UTF-8", name);
                PassThrough.decode(bytes, charset_id)
            }
        }
    }
}
