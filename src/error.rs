use std::fmt;

use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenError>;

/// Which of the two vector files a cursor walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Input,
    Expected,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Input => write!(f, "input vectors"),
            Stream::Expected => write!(f, "expected vectors"),
        }
    }
}

/// Everything that stops a script from being generated.
///
/// Register and memory mismatches are not here: those are diagnostics
/// written into the generated script and only show up in simulation.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("{stream} ended unexpectedly after line {line_no}")]
    EndOfStream { stream: Stream, line_no: usize },

    #[error("test `{name}` not found in {stream}")]
    NotFound { stream: Stream, name: String },

    #[error("malformed vector in test `{test}` at line {line_no} ({reason}): `{line}`")]
    MalformedVector {
        test: String,
        line_no: usize,
        line: String,
        reason: String,
    },

    #[error("test `{input}` does not correspond to expected test `{expected}`")]
    NameMismatch { input: String, expected: String },

    #[error("test #{index} (`{name}`): {source}")]
    Test {
        index: usize,
        name: String,
        #[source]
        source: Box<GenError>,
    },

    #[error("i/o error on `{path}`: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenError {
    /// Attach the position in the run at which the error was hit.
    pub fn at_test(self, index: usize, name: &str) -> Self {
        GenError::Test {
            index,
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through `Test` wrappers.
    pub fn root(&self) -> &GenError {
        match self {
            GenError::Test { source, .. } => source.root(),
            other => other,
        }
    }
}
