//! CLI argument definitions for `duodeck`.

use clap::{value_parser, Arg, ArgAction, Command};

/// Default location of the persisted track list.
pub const DEFAULT_LIBRARY: &str = "my_library.csv";

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("duodeck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Two-deck DJ player for the terminal")
        .arg(
            Arg::new("library")
                .long("library")
                .short('l')
                .value_name("PATH")
                .default_value(DEFAULT_LIBRARY)
                .global(true)
                .help("Track list to load at startup and save on exit"),
        )
        .arg(
            Arg::new("block-size")
                .long("block-size")
                .value_name("FRAMES")
                .value_parser(value_parser!(usize))
                .default_value("512")
                .help("Frames rendered per audio callback"),
        )
        .arg(
            Arg::new("sample-rate")
                .long("sample-rate")
                .value_name("HZ")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("44100")
                .help("Output sample rate"),
        )
        .arg(
            Arg::new("tick-ms")
                .long("tick-ms")
                .value_name("MS")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("500")
                .help("Interval of the position poll and loop check"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .short('S')
                .value_name("PATH")
                .help("JSON deck settings applied to both decks"),
        )
        .arg(
            Arg::new("deck1")
                .long("deck1")
                .value_name("FILE")
                .help("Audio file to load into deck 1"),
        )
        .arg(
            Arg::new("deck2")
                .long("deck2")
                .value_name("FILE")
                .help("Audio file to load into deck 2"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("No TUI: play the loaded decks until both stop"),
        )
        .subcommand(
            Command::new("library")
                .about("Inspect or edit the track library")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List tracks"))
                .subcommand(
                    Command::new("import")
                        .about("Add audio files to the library")
                        .arg(
                            Arg::new("FILES")
                                .required(true)
                                .num_args(1..)
                                .help("Files to import"),
                        ),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Remove the track at INDEX")
                        .arg(
                            Arg::new("INDEX")
                                .required(true)
                                .value_parser(value_parser!(usize)),
                        ),
                )
                .subcommand(
                    Command::new("search")
                        .about("Print the first track whose title contains TEXT (any case)")
                        .arg(Arg::new("TEXT").required(true)),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Decode a file and print its length and sample rate")
                .arg(Arg::new("INPUT").required(true).index(1)),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand_required(true)
                .subcommand(
                    Command::new("settings-json").about("Print a default deck settings payload"),
                ),
        )
}
