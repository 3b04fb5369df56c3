//! Errors surfaced by the resolver, metadata store and mutation engine,
//! mapped one-to-one onto the POSIX errno categories from the error-handling
//! design: NOENT, EEXIST, NOTEMPTY, EPERM, ENOSYS, and a catch-all EIO for
//! forwarded blob-store failures.

use libc::{c_int, EEXIST, EINVAL, EIO, ENOENT, ENOSYS, ENOTEMPTY, EPERM};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such tag or file")]
    NotFound,
    #[error("name already exists")]
    AlreadyExists,
    #[error("tag still has members")]
    NotEmpty,
    #[error("operation not permitted: {0}")]
    NotPermitted(&'static str),
    #[error("unsupported structural rename")]
    Unsupported,
    #[error("invalid path component")]
    InvalidName,
    #[error("backing store error: {0}")]
    Blob(#[from] std::io::Error),
}

impl FsError {
    pub fn errno(&self) -> c_int {
        match self {
            FsError::NotFound => ENOENT,
            FsError::AlreadyExists => EEXIST,
            FsError::NotEmpty => ENOTEMPTY,
            FsError::NotPermitted(_) => EPERM,
            FsError::Unsupported => ENOSYS,
            FsError::InvalidName => EINVAL,
            FsError::Blob(e) => e.raw_os_error().unwrap_or(EIO),
        }
    }
}
