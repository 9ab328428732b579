pub mod path;
pub mod signer;
pub mod storage;

use thiserror::Error;

pub use path::{entity_id_from_object_path, new_entity_id, normalize_object_path, object_path};
pub use signer::{PresignedUpload, UploadSigner};
pub use storage::{ObjectStorage, ObjectWriter};

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),

    #[error("upload URL has expired")]
    Expired,

    #[error("upload signature does not match")]
    BadSignature,

    #[error("object exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("object already exists")]
    AlreadyExists,

    #[error("object not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ObjectError>;
