//! REST client for the lender's backend.
//!
//! `ApiClient` is the single request pipeline: it attaches the stored
//! bearer token and ends the session when the backend answers 401.
//! `ResourceService` layers the Loan/Customer/Payment/Admin CRUD calls on top,
//! and `ListFilter` narrows listed records locally.

pub mod client;
pub mod error;
pub mod filter;
pub mod resources;

pub use client::{ApiClient, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::{ApiError, ErrorBody};
pub use filter::ListFilter;
pub use resources::{Resource, ResourceService};
