//! Error types for the harvest pipeline

use thiserror::Error;

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while harvesting and stitching
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to bring up the page host
    #[error("Host initialization failed: {0}")]
    InitializationError(String),

    /// Failed to navigate to a page
    #[error("Navigation failed: {0}")]
    NavigationError(String),

    /// A page never signalled ready
    #[error("Navigation timed out after {0}ms")]
    NavigationTimeout(u64),

    /// The tab worker went away mid-operation
    #[error("Tab closed: {0}")]
    TabClosed(String),

    /// No matching images were found on the visited pages
    #[error("No matching images found for prefix {0:?}")]
    NoImages(String),

    /// Failed to fetch an image body
    #[error("Failed to fetch image: {0}")]
    FetchError(String),

    /// Fetched bytes could not be decoded as an image
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// Every collected image failed to load
    #[error("All {0} image loads failed")]
    AllLoadsFailed(usize),

    /// The compositor was handed nothing to draw
    #[error("Nothing to compose: {0}")]
    EmptyInput(String),

    /// Failed to encode the stitched canvas
    #[error("Failed to encode artifact: {0}")]
    EncodeError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error while reading or writing local state
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
