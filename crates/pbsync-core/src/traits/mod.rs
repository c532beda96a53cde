//! Core traits for instances, sessions and the pipeline's collaborators.

mod backend;
mod observer;
mod progress;
mod resolver;
mod session;

pub use backend::Backend;
pub use observer::MigrationObserver;
pub use progress::{NoProgress, ProgressSink};
pub use resolver::CredentialResolver;
pub use session::Session;
