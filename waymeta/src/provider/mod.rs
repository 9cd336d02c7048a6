//! Raster tile provider abstraction
//!
//! This module provides the traits and implementations for downloading raw
//! tile bytes from XYZ tile services. A provider is a URL template plus an
//! HTTP client; the HTTP client is a trait so tests can substitute a mock.
//!
//! ```ignore
//! use waymeta::provider::{AsyncReqwestClient, TemplateProvider, UrlTemplate};
//!
//! let http_client = AsyncReqwestClient::new()?;
//! let template = UrlTemplate::parse("http://mt1.google.com/vt/lyrs=s&x=${x}&y=${y}&z=${z}")?;
//! let provider = TemplateProvider::new("greenery", template, http_client);
//! ```

mod http;
mod template;
mod tiled;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT};
pub use template::{TemplateError, UrlTemplate};
pub use tiled::TemplateProvider;
pub use types::{AsyncProvider, ProviderError};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
