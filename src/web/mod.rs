//! Web framework integration.
//!
//! The binder never sees a framework's request type. Integrations either
//! implement [`RequestContext`] for it or copy it into a [`RequestAdapter`].
//!
//! ```text
//! framework request
//!     -> RequestContext (method, params, query, headers, body)
//!     -> path_source / query_source / header_source / form_source
//!     -> Walker
//! ```

mod adapter;
mod extract;

pub use adapter::RequestAdapter;
pub use extract::{form_source, header_source, path_source, query_source, RequestContext};
