//! Error types

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::binary::read::ReadEof;
use crate::tag::DisplayTag;

/// Errors that originate when parsing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadEof,
    BadValue,
    BadVersion,
    BadOffset,
    BadIndex,
    LimitExceeded,
    MissingValue,
    MissingTable(u32),
    UnsuitableCmap,
    NotImplemented,
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::BadEof
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::BadValue
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadEof => write!(f, "end of data reached unexpectedly"),
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::BadVersion => write!(f, "unexpected data version"),
            ParseError::BadOffset => write!(f, "invalid data offset"),
            ParseError::BadIndex => write!(f, "invalid data index"),
            ParseError::LimitExceeded => write!(f, "limit exceeded"),
            ParseError::MissingValue => write!(f, "an expected data value was missing"),
            ParseError::MissingTable(tag) => {
                write!(f, "font is missing '{}' table", DisplayTag(*tag))
            }
            ParseError::UnsuitableCmap => write!(f, "no suitable cmap subtable"),
            ParseError::NotImplemented => write!(f, "feature not implemented"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors raised by a font engine operation.
///
/// The merge components treat these the same as a missing glyph: they are logged and the
/// current codepoint is skipped.
#[derive(Debug)]
pub enum FontError {
    Parse(ParseError),
    Io(io::Error),
    /// The slot does not exist in the active slot space.
    BadSlot(usize),
    /// The subfont index is out of range.
    BadSubfont(usize),
    /// There is no lookup with this name.
    BadLookup(String),
    /// The engine cannot perform the requested operation on this font.
    Unsupported(&'static str),
    /// The clipboard is empty.
    EmptyClipboard,
}

impl From<ParseError> for FontError {
    fn from(error: ParseError) -> Self {
        FontError::Parse(error)
    }
}

impl From<ReadEof> for FontError {
    fn from(_error: ReadEof) -> Self {
        FontError::Parse(ParseError::BadEof)
    }
}

impl From<io::Error> for FontError {
    fn from(error: io::Error) -> Self {
        FontError::Io(error)
    }
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::Parse(err) => write!(f, "font parse: {}", err),
            FontError::Io(err) => write!(f, "font io: {}", err),
            FontError::BadSlot(slot) => write!(f, "no glyph slot {}", slot),
            FontError::BadSubfont(index) => write!(f, "no subfont {}", index),
            FontError::BadLookup(name) => write!(f, "no lookup '{}'", name),
            FontError::Unsupported(what) => write!(f, "unsupported operation: {}", what),
            FontError::EmptyClipboard => write!(f, "clipboard is empty"),
        }
    }
}

impl std::error::Error for FontError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FontError::Parse(err) => Some(err),
            FontError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Fatal errors that abort the build of a variant.
#[derive(Debug)]
pub enum BuildError {
    /// A donor or destination font could not be opened.
    Open { path: PathBuf, source: FontError },
    /// The output directory could not be created.
    OutputDir { path: PathBuf, source: io::Error },
    /// The generated font could not be written or published.
    Generate { path: PathBuf, source: FontError },
    /// The mapping log could not be written.
    Log(io::Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Open { path, source } => {
                write!(f, "unable to open font {}: {}", path.display(), source)
            }
            BuildError::OutputDir { path, source } => {
                write!(
                    f,
                    "unable to create output directory {}: {}",
                    path.display(),
                    source
                )
            }
            BuildError::Generate { path, source } => {
                write!(f, "unable to generate {}: {}", path.display(), source)
            }
            BuildError::Log(err) => write!(f, "mapping log: {}", err),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Open { source, .. } => Some(source),
            BuildError::OutputDir { source, .. } => Some(source),
            BuildError::Generate { source, .. } => Some(source),
            BuildError::Log(err) => Some(err),
        }
    }
}
