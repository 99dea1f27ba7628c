use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabError {
    #[error("vocab: empty trace for {id:?}")]
    EmptyTrace { id: String },

    #[error("vocab: shape mismatch: expected {expected} {what}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("vocab: unknown frame {0:?}")]
    UnknownFrame(String),
}
