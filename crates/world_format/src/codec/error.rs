use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::io::CursorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Signature,
    Header,
    Tiles,
    Chests,
    Signs,
    Npcs,
    NpcNames,
    Footer,
}

impl SectionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Header => "header",
            Self::Tiles => "tiles",
            Self::Chests => "chests",
            Self::Signs => "signs",
            Self::Npcs => "npcs",
            Self::NpcNames => "npc_names",
            Self::Footer => "footer",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum WorldCodecError {
    #[error("unrecognized file signature {found:02x?}")]
    UnrecognizedFormat { found: [u8; 4] },
    #[error("unsupported format version {version} (supported {min}..={max})")]
    UnsupportedVersion { version: u32, min: u32, max: u32 },
    #[error("unexpected end of data in {section} section at offset {offset} (needed {needed} bytes)")]
    UnexpectedEndOfData {
        section: SectionKind,
        offset: usize,
        needed: usize,
    },
    #[error("corrupt tile stream at offset {offset}, tile {tile_index}: {message}")]
    CorruptTileStream {
        offset: usize,
        tile_index: usize,
        message: String,
    },
    #[error("invalid {section} data at offset {offset}: {message}")]
    InvalidData {
        section: SectionKind,
        offset: usize,
        message: String,
    },
    #[error("checksum mismatch: footer says {expected}, contents hash to {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error(
        "cannot save as format version {target_version}: {feature} needs version {required_version} or later ({detail})"
    )]
    UnsupportedDowngrade {
        target_version: u32,
        feature: &'static str,
        required_version: u32,
        detail: String,
    },
    #[error("world cannot be encoded: {message}")]
    InvalidWorld { message: String },
    #[error("failed to read/write file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WorldCodecError {
    /// Absolute byte offset where decoding failed, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::UnexpectedEndOfData { offset, .. }
            | Self::CorruptTileStream { offset, .. }
            | Self::InvalidData { offset, .. } => Some(*offset),
            Self::UnrecognizedFormat { .. } => Some(0),
            _ => None,
        }
    }

    pub fn section(&self) -> Option<SectionKind> {
        match self {
            Self::UnexpectedEndOfData { section, .. } | Self::InvalidData { section, .. } => {
                Some(*section)
            }
            Self::CorruptTileStream { .. } => Some(SectionKind::Tiles),
            Self::UnrecognizedFormat { .. } | Self::UnsupportedVersion { .. } => {
                Some(SectionKind::Signature)
            }
            Self::ChecksumMismatch { .. } => Some(SectionKind::Footer),
            _ => None,
        }
    }

    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::UnexpectedEndOfData { .. })
    }

    pub(crate) fn from_cursor(section: SectionKind, error: CursorError) -> Self {
        match error {
            CursorError::UnexpectedEndOfData { offset, needed, .. } => Self::UnexpectedEndOfData {
                section,
                offset,
                needed,
            },
            CursorError::InvalidUtf8 { offset } => Self::InvalidData {
                section,
                offset,
                message: "string is not valid UTF-8".to_string(),
            },
            CursorError::StringTooLong { .. } | CursorError::SectionTooLarge { .. } => {
                Self::InvalidWorld {
                    message: format!("{section} section: {error}"),
                }
            }
        }
    }

    pub(crate) fn invalid_data(section: SectionKind, offset: usize, message: impl Into<String>) -> Self {
        Self::InvalidData {
            section,
            offset,
            message: message.into(),
        }
    }
}

/// Attaches the section being processed to a cursor failure.
pub(crate) trait InSection<T> {
    fn in_section(self, section: SectionKind) -> Result<T, WorldCodecError>;
}

impl<T> InSection<T> for Result<T, CursorError> {
    fn in_section(self, section: SectionKind) -> Result<T, WorldCodecError> {
        self.map_err(|error| WorldCodecError::from_cursor(section, error))
    }
}
