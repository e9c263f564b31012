//! Per-connection settings.

use crate::native::constants::FB_DEFAULT_DIALECT;

/// How column keys are cased when metadata is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// Keep the identifier as the engine reports it (upper case).
    #[default]
    Preserve,
    /// Lower-case identifiers that contain no lower-case letter.
    Lower,
}

/// Which text decoding strategy a connection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingMode {
    /// Treat all text as UTF-8.
    #[default]
    PassThrough,
    /// Read the character set catalog once at attach time and decode
    /// each column in its declared character set.
    CharsetAware,
}

/// Settings threaded through a connection and every statement it prepares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// SQL dialect passed to prepare.
    pub dialect: u16,
    /// Key rows by column alias (true) or by column name (false).
    pub alias_keys: bool,
    /// Decode DATE columns as dates (true) or midnight timestamps (false).
    pub date_as_date: bool,
    /// Case applied to column keys.
    pub key_case: KeyCase,
    /// Reuse prepared statements per SQL text.
    pub statement_cache: bool,
    /// Text decoding strategy.
    pub encoding: EncodingMode,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            dialect: FB_DEFAULT_DIALECT,
            alias_keys: true,
            date_as_date: true,
            key_case: KeyCase::Preserve,
            statement_cache: true,
            encoding: EncodingMode::PassThrough,
        }
    }
}

impl ConnectionOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: u16) -> Self {
        self.dialect = dialect;
        self
    }

    /// Key rows by alias or by raw column name.
    pub fn with_alias_keys(mut self, alias_keys: bool) -> Self {
        self.alias_keys = alias_keys;
        self
    }

    /// Decode DATE columns as dates or as timestamps.
    pub fn with_date_as_date(mut self, date_as_date: bool) -> Self {
        self.date_as_date = date_as_date;
        self
    }

    /// Set column key casing.
    pub fn with_key_case(mut self, key_case: KeyCase) -> Self {
        self.key_case = key_case;
        self
    }

    /// Enable or disable the statement cache.
    pub fn with_statement_cache(mut self, enabled: bool) -> Self {
        self.statement_cache = enabled;
        self
    }

    /// Set the text decoding strategy.
    pub fn with_encoding(mut self, encoding: EncodingMode) -> Self {
        self.encoding = encoding;
        self
    }
}
