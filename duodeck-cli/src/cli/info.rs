//! `duodeck info FILE`.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use duodeck_lib::audio::{AudioDecoder, SymphoniaDecoder};
use duodeck_lib::library::seconds_to_minutes;

pub fn maybe_run_info(args: &ArgMatches) -> Result<Option<i32>> {
    let Some(("info", sub)) = args.subcommand() else {
        return Ok(None);
    };
    let Some(input) = sub.get_one::<String>("INPUT") else {
        return Ok(Some(2));
    };

    let source = SymphoniaDecoder::new()
        .decode(Path::new(input))
        .with_context(|| format!("decoding {}", input))?;

    println!("file: {}", input);
    println!(
        "length: {:.2}s ({})",
        source.length_in_seconds(),
        seconds_to_minutes(source.length_in_seconds())
    );
    println!("sample rate: {} Hz", source.sample_rate());
    println!("frames: {}", source.frames());
    Ok(Some(0))
}
