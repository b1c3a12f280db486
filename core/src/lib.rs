//! Synchronous client for the Trestle REST services.
//!
//! # Overview
//! `Trestle` exposes user accounts, object storage, geo lookup, audio and
//! image processing, jobs, mailboxes, S3-style storage, statistics and
//! e-mail sending as plain method calls. Each call is one blocking,
//! Basic-authenticated HTTP round trip, or none at all when a pre-flight
//! check rejects the input.
//!
//! # Design
//! - `route` holds the (service, operation) table: verb, path shape,
//!   identifier rule and parameter checks. Façade methods are table lookups.
//! - `dispatch` is the only code that talks to a `Transport`. It builds the
//!   request, executes it once and maps the response to a `Payload` or a
//!   `TrestleError`.
//! - Credentials are per instance and immutable; the return format is the
//!   only mutable setting.
//!
//! ```no_run
//! use trestle_core::{Params, ReturnFormat, Trestle};
//!
//! let mut client = Trestle::new("api-key", "api-secret");
//! client.set_return_format(ReturnFormat::Structure);
//! let user = client.user_create(&Params::from([
//!     ("email", "jane@example.com"),
//!     ("password", "correct horse"),
//! ]))?;
//! println!("{:?}", user.get("id"));
//! # Ok::<(), trestle_core::TrestleError>(())
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod route;
pub mod types;
pub mod validate;

pub use client::{ErrorLog, Trestle};
pub use config::TrestleBuilder;
pub use dispatch::Dispatcher;
pub use endpoint::{Endpoints, Service};
pub use error::{ErrorKind, Result, TrestleError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use route::{Operation, Route, Target};
pub use types::{Credentials, Params, Payload, ReturnFormat};
