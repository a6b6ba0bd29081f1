//! # Mockline - request interception for mockline-http clients
//!
//! Swaps the transport adapter of an [`HttpClient`](mockline_http::HttpClient)
//! for one that never touches the network. Intercepted requests are recorded
//! in order and either answered from declared stubs or held pending until the
//! test settles them by hand.
//!
//! # Architecture Overview
//!
//! - [`registry`]: declared stub rules and their match precedence
//! - [`ledger`]: every intercepted request, with manual settlement
//! - [`dispatch`]: the adapter tying the two together
//! - [`scheduler`]: timers that let pending request futures make progress
//! - [`transport`]: install/uninstall and the scoped [`MockTransport::with_mock`]
//!
//! # Usage
//!
//! ```rust,no_run
//! use mockline::{MockTransport, ResponseDescriptor};
//! use mockline_http::HttpClient;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let mock = MockTransport::new();
//!
//! mock.with_mock_on(&client, || async {
//!     let pending = tokio::spawn({
//!         let client = client.clone();
//!         async move { client.get("/users/12345").await }
//!     });
//!
//!     mock.wait().await;
//!     let request = mock.requests().most_recent().expect("request was issued");
//!     request
//!         .respond_with(ResponseDescriptor::new(200).with_body(json!({ "id": 12345 })))
//!         .await?;
//!
//!     let response = pending.await??;
//!     assert_eq!(response.data["id"], 12345);
//!     Ok::<_, Box<dyn std::error::Error>>(())
//! })
//! .await??;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]

// =============================================================================
// Matching and replies
// =============================================================================

/// URL and method matchers
pub mod matcher;

/// What a stub or manual settlement answers with
pub mod reply;

/// Declared stub rules
pub mod registry;

// =============================================================================
// Interception
// =============================================================================

/// Record of intercepted requests
pub mod ledger;

/// Adapter that answers intercepted requests
pub mod dispatch;

/// Deferred timers
pub mod scheduler;

/// Install/uninstall controller
pub mod transport;

// =============================================================================
// Ambient
// =============================================================================

pub mod config;
pub mod error;
pub mod logging;

pub use config::{MockConfig, DEFAULT_DELAY_MS, DELAY_ENV_VAR, MAX_DELAY_MS};
pub use dispatch::MockAdapter;
pub use error::{MockError, MockResult};
pub use ledger::{RequestLedger, TrackedRequest};
pub use logging::init_test_logging;
pub use matcher::{MethodMatcher, UrlMatcher};
pub use registry::{StubHit, StubLifetime, StubRegistry, StubRule};
pub use reply::{ErrorDescriptor, Reply, ReplyFn, ResponseDescriptor};
pub use scheduler::{NoCallback, Scheduler, Timer};
pub use transport::MockTransport;
