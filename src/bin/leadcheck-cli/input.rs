use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::args::Cli;

const PROMPT: &str = "Please enter the filename containing the email leads: ";

/// Addresses from stdin, the given file, or a file named at the prompt.
/// A missing file surfaces as `io::ErrorKind::NotFound`.
pub fn collect(cli: &Cli) -> io::Result<Vec<String>> {
    if cli.stdin {
        return read_addresses(io::stdin().lock());
    }
    let path = match &cli.file {
        Some(path) => path.clone(),
        None => prompt_filename(io::stdin().lock(), io::stdout().lock())?,
    };
    let file = File::open(&path)?;
    read_addresses(BufReader::new(file))
}

/// One address per line; surrounding whitespace trimmed, blank lines dropped.
pub fn read_addresses<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut addresses = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            addresses.push(trimmed.to_string());
        }
    }
    Ok(addresses)
}

pub fn prompt_filename<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<PathBuf> {
    write!(output, "{PROMPT}")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(PathBuf::from(answer.trim()))
}
