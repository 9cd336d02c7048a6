//! Provider trait and error types.

use std::future::Future;

use thiserror::Error;

use crate::coord::TileIndex;

/// Errors raised while downloading a tile.
///
/// Clonable so a failure can be stored in the tile cache and handed to every
/// caller that asks for the same tile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, body read, client setup).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// A configured request header could not be encoded.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

}

/// A source of raw tile bytes addressed by XYZ tile index.
pub trait AsyncProvider: Send + Sync {
    /// Downloads the encoded image for one tile.
    fn download_tile(
        &self,
        tile: TileIndex,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Human-readable provider name for logs.
    fn name(&self) -> &str;
}
