pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod models;
pub mod request;

pub use client::PastyClient;
pub use config::ClientConfig;
pub use credentials::Credentials;
pub use error::{ClientError, Result, TransportErrorKind};
pub use executor::{RequestExecutor, Response, classify_response};
pub use models::{ClipboardItem, Token};
pub use request::{Method, RequestDescriptor};
