//! Layered settings: a TOML file picked by build profile (or `--settings`),
//! then `TESSERA__*` environment variables on top.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
