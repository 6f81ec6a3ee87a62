use thiserror::Error;

/// Unified error type for sealing, persisting and validating blocks
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("block must contain at least one post")]
    EmptyPosts,

    #[error("block holds {0} posts, more than a u32 count can frame")]
    TooManyPosts(usize),

    #[error("post {index} is {len} bytes, more than a u32 length can frame")]
    PostTooLarge { index: usize, len: usize },

    #[error("difficulty {0} exceeds the 64 hex digits of a digest")]
    DifficultyOutOfRange(u32),

    #[error("malformed block data: {0}")]
    Malformed(String),

    #[error("merkle root mismatch: header records {recorded}, posts hash to {computed}")]
    MerkleMismatch { recorded: String, computed: String },

    #[error("header hash {hash} does not meet difficulty {difficulty}")]
    InsufficientWork { hash: String, difficulty: u32 },

    #[error("broken chain link: expected previous {expected}, found {found}")]
    BrokenLink { expected: String, found: String },

    #[error("nonce search cancelled")]
    Cancelled,

    #[error("nonce search deadline exceeded")]
    DeadlineExceeded,

    #[error("nonce space exhausted without meeting difficulty")]
    NonceSpaceExhausted,

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index error: {0}")]
    Index(String),
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, BlockError>;
