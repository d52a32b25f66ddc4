//! Configuration for axon.
//!
//! The effective [`Config`] is the built-in defaults with `config.toml` merged
//! on top, plus the `-m` / `-q` overrides from the command line. Unknown keys
//! in the file are ignored for forward compatibility.

mod model;
mod operations;
mod paths;
mod prompt;
mod types;


pub use model::Config;
pub use paths::{cache_home, config_home, user_shell};
pub use prompt::Prompt;
pub use types::RefusalPolicy;
