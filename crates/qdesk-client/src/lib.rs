//! # qdesk-client
//!
//! HTTP queue-service client for the qdesk console.
//!
//! Thin, replaceable glue over the server's REST surface. The coordination
//! layer depends only on the [`qdesk_core::QueueService`] trait; this
//! crate is one implementation of it.

pub mod http;

pub use http::HttpQueueService;
