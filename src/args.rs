// Commandline argument parser using clap for the relay

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct RelayArgs {
    #[command(subcommand, long_about)]
    /// Which task to perform, an interactive session or a file replay
    pub command: RelayTask,
}

#[derive(Debug, Subcommand, Clone)]
pub enum RelayTask {
    /// Drive the registry interactively with stdin commands
    #[command(about)]
    Interactive(InteractiveCommand),

    /// Replay a saved session file through the registry
    #[command(about)]
    Replay(ReplayCommand),
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct InteractiveCommand {
    /// Session file to load before the prompt comes up
    #[arg(short = 'l', long = "load")]
    pub load: Option<String>,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct ReplayCommand {
    /// Session file to replay
    #[arg(short = 'i', long = "in")]
    pub infile: String,

    /// Playback rate, snapped to the nearest of 0.25, 0.5, 1, 1.5, 2
    #[arg(short = 's', long = "speed", default_value_t = 1.0)]
    pub speed: f64,

    /// Restart from the first frame after the last one
    #[arg(long = "loop")]
    pub looping: bool,
}
