use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use aws_sdk_ec2::types::Instance;

use crate::format::Formatter;

/// Resolves a match set down to a single instance.
///
/// With one match it is returned as-is. With several, a pre-supplied pick is
/// range-checked and used; otherwise the matches are listed and a selection is
/// read interactively from stdin.
pub fn select_instance<'a>(
    matches: &'a [Instance],
    pick: Option<usize>,
    format: Formatter,
) -> Result<&'a Instance> {
    if matches.is_empty() {
        bail!("No matches found");
    }
    if matches.len() == 1 {
        return Ok(&matches[0]);
    }

    if let Some(pick) = pick {
        if !(1..=matches.len()).contains(&pick) {
            bail!("No option with index: {pick}");
        }
        return Ok(&matches[pick - 1]);
    }

    for (i, instance) in matches.iter().enumerate() {
        println!("[{}] {}", i + 1, format(instance));
    }
    print!("pick an option [1-{}] ", matches.len());
    io::stdout().flush()?;

    let choice = read_number(1, matches.len(), io::stdin().lock(), io::stderr())?;
    println!();

    Ok(&matches[choice - 1])
}

/// Reads lines from `input` until one parses as an integer in
/// `[min, max]`. Rejected lines are reported on `err` and the read repeats;
/// only stream closure ends the loop without a selection.
pub fn read_number<R: BufRead, W: Write>(
    min: usize,
    max: usize,
    mut input: R,
    mut err: W,
) -> io::Result<usize> {
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an option was picked",
            ));
        }

        let entered = line.trim();
        match entered.parse::<i64>() {
            Ok(choice) if choice >= min as i64 && choice <= max as i64 => {
                return Ok(choice as usize)
            }
            Ok(choice) => writeln!(err, "invalid option: {choice} (expected {min}-{max})")?,
            Err(_) => writeln!(err, "invalid option: {entered:?} (expected a number)")?,
        }
    }
}
