use thiserror::Error;

#[derive(Error, Debug)]
pub enum WishlistError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Malformed wishlist data: {0}")]
    Malformed(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("No user is signed in")]
    Unauthenticated,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WishlistError>;

impl From<std::io::Error> for WishlistError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for WishlistError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for WishlistError {
    fn from(err: reqwest::Error) -> Self {
        Self::Catalog(err.to_string())
    }
}
