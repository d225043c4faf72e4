//! Request handlers.

pub mod health;
pub mod jobs;
pub mod playback;
pub mod videos;

pub use health::*;
pub use jobs::*;
pub use playback::*;
pub use videos::*;
