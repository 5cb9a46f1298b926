//! Test doubles for the fetch and storage seams.
//!
//! Nothing here touches the network or the filesystem:
//!
//! - [`ScriptedTransport`]: per-URL queues of canned responses
//! - [`FailingRequestCache`]: a cache whose writes always fail
//! - [`FailingRecordStore`]: a record store that rejects selected keys
//! - [`pages`]: small HTML documents shaped like the source site's pages
//! - Assertion macros for `Result` values, exported at the crate root
//!
//! # Example
//!
//! ```rust
//! use pitchcrawl::fetch::RawResponse;
//! use pitchcrawl::testkit::ScriptedTransport;
//!
//! let transport = ScriptedTransport::new()
//!     .with_response("https://fbref.com/en/comps/", RawResponse::with_status(503, ""))
//!     .with_page("https://fbref.com/en/comps/", "<html></html>");
//! assert_eq!(transport.request_count("https://fbref.com/en/comps/"), 0);
//! ```

pub mod assertions;
pub mod doubles;
pub mod pages;
pub mod transport;

pub use doubles::{FailingRecordStore, FailingRequestCache};
pub use transport::ScriptedTransport;
