use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "filecloud")]
#[command(author, version, about = "Telegram file store bot with permanent share links", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot in long polling mode
    Run {
        /// Keep all data in process memory instead of Postgres (lost on exit)
        #[arg(long)]
        in_memory: bool,
    },

    /// Create missing tables and seed admin users and default settings
    InitDb,

    /// Validate environment configuration and print warnings
    CheckConfig,

    /// Print bot statistics as JSON
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_no_subcommand() {
        let cli = Cli::try_parse_from(["filecloud"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_in_memory_flag() {
        let cli = Cli::try_parse_from(["filecloud", "run", "--in-memory"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run { in_memory: true }));

        let cli = Cli::try_parse_from(["filecloud", "init-db"]).unwrap();
        assert_eq!(cli.command, Some(Commands::InitDb));
    }
}
