use anyhow::Result;
use clap::{Parser, Subcommand};
use heave::cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Start(args) => args.run(),
        Command::Compute(args) => args.run(),
    }
}

#[derive(Parser)]
#[command(name = "heave", about = "PTO extension-rate telemetry")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the sensor loop and WebSocket server with the specified configuration.
    Start(cli::start::StartArgs),
    /// Convert a single angular velocity sample and print the broadcast message.
    Compute(cli::compute::ComputeArgs),
}
