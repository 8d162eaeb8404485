//! `duodeck library ...` subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use duodeck_lib::audio::SymphoniaDecoder;
use duodeck_lib::library::Library;

/// Run a library subcommand if one was given.
pub fn maybe_run_library(args: &ArgMatches, library_path: &Path) -> Result<Option<i32>> {
    let Some(("library", sub)) = args.subcommand() else {
        return Ok(None);
    };

    let mut library = Library::load(library_path)
        .with_context(|| format!("reading {}", library_path.display()))?;

    let code = match sub.subcommand() {
        Some(("list", _)) => {
            print_tracks(&library);
            0
        }
        Some(("import", import)) => {
            let files: Vec<&String> = import.get_many::<String>("FILES").into_iter().flatten().collect();
            let report = library.import(&files, &SymphoniaDecoder::new());
            for title in &report.added {
                println!("added {}", title);
            }
            for title in &report.duplicates {
                println!("{} already in library", title);
            }
            for (path, reason) in &report.failed {
                eprintln!("failed to import {}: {}", path.display(), reason);
            }
            save(&library, library_path)?;
            if report.failed.is_empty() {
                0
            } else {
                1
            }
        }
        Some(("remove", remove)) => {
            let index = remove.get_one::<usize>("INDEX").copied().unwrap_or_default();
            let track = library.remove(index)?;
            save(&library, library_path)?;
            println!("removed {}", track.title);
            0
        }
        Some(("search", search)) => {
            let text = search.get_one::<String>("TEXT").map(String::as_str).unwrap_or("");
            match library.find(text) {
                Some(index) => {
                    if let Some(track) = library.get(index) {
                        println!("{}\t{}\t{}", index, track.title, track.length);
                    }
                    0
                }
                None => {
                    println!("no match for \"{}\"", text);
                    1
                }
            }
        }
        _ => 2,
    };

    Ok(Some(code))
}

fn print_tracks(library: &Library) {
    if library.is_empty() {
        println!("library is empty");
        return;
    }
    for (index, track) in library.tracks().iter().enumerate() {
        println!("{}\t{}\t{}\t{}", index, track.title, track.length, track.path.display());
    }
}

fn save(library: &Library, path: &Path) -> Result<()> {
    library
        .save(path)
        .with_context(|| format!("writing {}", path.display()))
}
