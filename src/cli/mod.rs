//! CLI definitions and parsing
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "wmipf",
    version,
    author = "neur0map",
    about = "Find WMI persistence (FilterToConsumerBindings) in an OBJECTS.DATA file",
    long_about = "wmipf keyword-searches a raw WMI repository (OBJECTS.DATA) for \
                  FilterToConsumerBinding instances and the consumers and filters they \
                  reference, without parsing the full repository structure."
)]
pub struct Cli {
    /// Path to the OBJECTS.DATA file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Config file path (defaults to ~/.config/wmipf/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// Single JSON document
    Json,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_input_only() {
        let cli = Cli::try_parse_from(["wmipf", "OBJECTS.DATA"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("OBJECTS.DATA"));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["wmipf"]).is_err());
    }

    #[test]
    fn test_optional_flags() {
        let cli =
            Cli::try_parse_from(["wmipf", "-v", "--format", "json", "-c", "cfg.toml", "in.data"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("cfg.toml")));
    }
}
