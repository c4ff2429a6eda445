pub mod activation;
pub mod artifact;
pub mod entrypoint;
pub mod error;
pub mod hooks;
pub mod id;
pub mod lookup;
pub mod metadata;
pub mod module;
pub mod prelude;
pub mod registry;
pub mod requirement;
pub mod scanner;
pub mod version;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
