use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "domofon")]
#[command(author, version, about = "Telegram bot that keeps an apartment-to-resident directory", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (default when no subcommand is given)
    Run,

    /// Print all registered residents to stdout without starting the bot
    List,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
