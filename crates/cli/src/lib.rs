use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opflow")]
#[command(about = "Opflow - options flow, gamma exposure and arbitrage analytics for B3")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file; defaults plus environment when absent
    #[arg(short, long, global = true, env = "OPFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format; overrides `observability.log_format`
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Override the configured HTTP port
        #[arg(long)]
        http: Option<u16>,
    },

    /// Capture one ticker and print the result as JSON
    Capture {
        /// Underlying symbol, e.g. PETR4
        ticker: String,

        /// Also run the arbitrage screener
        #[arg(long)]
        screen: bool,
    },

    /// Validate configuration without starting anything
    Validate,

    /// Write a configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "opflow.yaml")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
    Compact,
}

impl LogFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_capture_arguments() {
        let cli = Cli::try_parse_from(["opflow", "capture", "PETR4", "--screen", "--log-format", "json"]).unwrap();

        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
        match cli.command {
            Commands::Capture { ticker, screen } => {
                assert_eq!(ticker, "PETR4");
                assert!(screen);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["opflow", "serve", "--http", "9000", "-c", "opflow.yaml"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("opflow.yaml")));
        assert!(matches!(cli.command, Commands::Serve { http: Some(9000) }));
    }
}
