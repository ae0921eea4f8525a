use anyhow::Result;
use clap::{Parser, Subcommand};
use settings::{MineArgs, ServeArgs};

mod mine;
mod serve;
mod settings;

#[derive(Parser)]
#[command(name = "word-miner")]
#[command(about = "Counts the words hidden in function names of popular repositories", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine repositories forever, publishing every word to the token stream
    Mine(MineArgs),

    /// Count words from the token stream and serve the live dashboard
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // TLS handshakes are chatty at debug
    if !cli.verbose {
        builder.filter_module("rustls", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Mine(args) => mine::run(args).await?,
        Commands::Serve(args) => serve::run(args).await?,
    }

    Ok(())
}
