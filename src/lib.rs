#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
#[doc(hidden)]
pub mod observability;
pub mod presence;
pub mod scheduler;
pub mod scripts;
pub mod transport;

pub use cli::Cli;
pub use config::Config;
pub use error::{HookError, Result};
