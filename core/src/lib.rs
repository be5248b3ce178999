//! Asynchronous API client core for the pet store service.
//!
//! # Overview
//! Marshals service calls into plain-data HTTP requests, executes them
//! through a pluggable [`Transport`], and coerces response bodies into typed
//! values described by a [`ResultShape`].
//!
//! # Design
//! - `Requestor` owns an explicit `Configuration`; there is no global
//!   default client.
//! - Request building is separated from I/O: `Requestor::build_request`
//!   produces an `HttpRequest` value, the transport executes it. Tests swap
//!   in stub transports.
//! - Parameters are `ParamValue`s; `Absent` is the only value ever dropped.
//! - Coercion is total: it never fails, only degrades to `Null` or `Opaque`.
//!
//! ```rust,ignore
//! use petstore_core::{Configuration, GetOptions, PetApi, Requestor};
//!
//! let requestor = Requestor::with_reqwest(Configuration::from_env());
//! let response = PetApi::new(&requestor).get(GetOptions { limit: Some(1) }).await?;
//! println!("{:?}", response.data);
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod coerce;
pub mod config;
pub mod error;
pub mod http;
pub mod params;
pub mod transport;
pub mod types;

pub use api::{ApiCall, GetOptions, PetApi};
pub use auth::{AuthLocation, AuthScheme};
pub use client::{with_callback, ApiResponse, RequestDescriptor, Requestor};
pub use coerce::{convert, PrimitiveType, ResultShape, TypedValue};
pub use config::{ClientOptions, Configuration};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport};
pub use params::{normalize, CollectionFormat, FilePart, ParamMap, ParamValue};
pub use transport::ReqwestTransport;
pub use types::{Model, Pet};
