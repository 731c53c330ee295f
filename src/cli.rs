use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "tilawa",
    version,
    about = "Read Quran pages in the terminal and listen to verse by verse recitation.",
    long_about = None
)]
pub struct Cli {
    /// Page to open (1-604)
    #[clap(short, long, value_name = "PAGE", value_parser = clap::value_parser!(u32).range(1..=604))]
    pub page: Option<u32>,

    /// Reciter to use when playback starts
    #[clap(short, long, value_name = "NAME")]
    pub reciter: Option<String>,

    /// Use a specific configuration file
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug output
    #[clap(long)]
    pub debug: bool,

    /// Print the verses of the page with their audio URLs and exit
    #[clap(short, long)]
    pub dump: bool,

    /// Print the available reciters and exit
    #[clap(short = 'l', long)]
    pub list_reciters: bool,

    /// Print today's prayer times and planned reminders and exit
    #[clap(short = 't', long)]
    pub prayer_times: bool,
}
