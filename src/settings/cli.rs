use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "tessera", about = "Account and session token service")]
pub struct Cli {
    /// Path to a settings file, overriding the profile default.
    #[arg(long)]
    pub settings: Option<String>,
}
