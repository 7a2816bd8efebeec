use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::speech::SpeechError;

/// Which half of a question/answer pair a spoken asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Question,
    Answer,
}

impl Role {
    /// Short tag used in scratch file names (`q_3.wav`, `a_3.wav`).
    pub fn tag(self) -> &'static str {
        match self {
            Role::Question => "q",
            Role::Answer => "a",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Question => write!(f, "question"),
            Role::Answer => write!(f, "answer"),
        }
    }
}

#[derive(Error, Debug)]
pub enum QaVideoError {
    #[error("Invalid input at data row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error("Input table contains no question/answer rows")]
    EmptyInput,

    #[error("Speech for row {row} {role} \"{snippet}\" failed: {source}")]
    Speech {
        row: usize,
        role: Role,
        snippet: String,
        #[source]
        source: SpeechError,
    },

    #[error("Failed to write slide image {}: {message}", path.display())]
    Slide { path: PathBuf, message: String },

    #[error("Video assembly failed: {0}")]
    Assembly(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QaVideoError {
    /// True when the failure came from reading back a synthesized file
    /// rather than from the engine itself.
    pub fn is_verification(&self) -> bool {
        matches!(
            self,
            QaVideoError::Speech {
                source: SpeechError::Verification { .. },
                ..
            }
        )
    }
}
