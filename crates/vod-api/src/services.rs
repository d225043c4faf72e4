//! Domain services behind the HTTP handlers.

pub mod dispatch;

pub use dispatch::{DispatchService, SubmitReceipt};
