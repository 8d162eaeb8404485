//! `duodeck create ...` payload generators.

use anyhow::Result;
use clap::ArgMatches;
use duodeck_lib::playback::DeckSettings;

pub fn maybe_run_create(args: &ArgMatches) -> Result<Option<i32>> {
    let Some(("create", sub)) = args.subcommand() else {
        return Ok(None);
    };
    match sub.subcommand() {
        Some(("settings-json", _)) => {
            println!("{}", DeckSettings::default().to_json_pretty()?);
            Ok(Some(0))
        }
        _ => Ok(Some(2)),
    }
}
