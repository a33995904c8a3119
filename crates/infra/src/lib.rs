//! Infrastructure layer: HTTP client, in-memory stores, config loading.

pub mod accounts;
pub mod config;
pub mod http;
pub mod pages;
pub mod scripted;
pub mod session;

mod integration_tests;

pub use accounts::InMemoryAccountStore;
pub use http::ReqwestTransport;
pub use pages::StaticPageResolver;
pub use scripted::{RecordedRequest, ScriptedTransport};
pub use session::{InMemorySession, SessionData, SessionRegistry};
