//! MemeFill App - editing session, settings and background jobs
//!
//! The `memefill` binary is a thin clap front end over these modules.

pub mod jobs;
pub mod session;
pub mod settings;

pub use jobs::{JobEvent, JobHandle, JobKind};
pub use session::{EditorSession, SessionError};
pub use settings::Settings;
