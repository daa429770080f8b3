// Library exports for Quad
// This allows integration tests and the binary to use Quad modules

pub mod app;
pub mod composer;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod listings;
pub mod media;
pub mod prefs;
pub mod remote;
pub mod router;
pub mod routes;
pub mod search;
pub mod session;
pub mod state;

pub use app::{App, Backends};
pub use dispatch::Action;
pub use error::{ClientError, ClientResult};
