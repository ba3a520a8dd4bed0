//! Blocking client for the Chainalysis KYT compliance API.
//!
//! # Overview
//! `KytClient` exposes the legacy V1 endpoints and the current V2 endpoints
//! side by side through `v1()` and `v2()`. Every operation returns the
//! decoded JSON payload or a typed `KytError`.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`);
//!   the network round-trip happens behind the `Transport` trait, which
//!   defaults to a ureq-backed implementation and can be swapped out.
//! - A single request pipeline (`connection`) attaches credentials and
//!   default headers for both service roots; a single classifier
//!   (`response`) maps statuses onto error variants.
//! - V1 and V2 are independent endpoint sets. They share the pipeline, not
//!   an interface.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod response;
pub mod transport;
pub mod types;
pub mod v1;
pub mod v2;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{KytClient, KytClientBuilder};
pub use config::ClientConfig;
pub use error::{KytError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use transport::UreqTransport;
pub use types::{AlertFilter, Extra, Page, RegisteredAddress, UserRename, V1Transfer};
pub use v1::V1Client;
pub use v2::{utc_timestamp, RegisterTransfer, RegisterWithdrawalAttempt, V2Client};
