//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keyglow")]
#[command(version, about = "Per-key RGB lighting compositor for USB HID keyboards")]
pub struct Cli {
    /// Path to the configuration file
    pub config: PathBuf,

    /// Run without the interactive prompt; stop with Ctrl-C
    #[arg(long)]
    pub headless: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_path_and_flags() {
        let cli = Cli::parse_from(["keyglow", "configs/example.toml"]);
        assert_eq!(cli.config, PathBuf::from("configs/example.toml"));
        assert!(!cli.headless);

        let cli = Cli::parse_from(["keyglow", "--headless", "kb.toml"]);
        assert!(cli.headless);
    }
}
