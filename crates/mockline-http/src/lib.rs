//! # Mockline HTTP - client contract with a swappable transport hook
//!
//! A small async HTTP client whose actual I/O is delegated to an [`Adapter`].
//! The adapter is held behind a lock on the client and can be replaced at
//! runtime, which is what lets `mockline` intercept traffic in tests.
//!
//! The shapes defined here (request config, response, error) are the contract
//! every adapter must honour: resolve with a [`Response`] for statuses the
//! request's validator accepts, reject with an [`HttpError`] otherwise.

pub mod adapter;
pub mod client;
pub mod error;
pub mod method;
pub mod network;
pub mod request;
pub mod response;

pub use adapter::{Adapter, SharedAdapter};
pub use client::{ClientConfig, ClientId, HttpClient};
pub use error::{ErrorCode, HttpError, HttpResult};
pub use method::Method;
pub use network::NetworkAdapter;
pub use request::{default_validate_status, Headers, RequestConfig, StatusValidator};
pub use response::{reason_phrase, settle, Response};
