use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use leadcheck_lib::{
    ColoredFormatter, LineFormatter, PlainFormatter, VerificationResult, write_report,
    write_valid_addresses,
};

use crate::args::{Cli, Format};

#[cfg(feature = "with-tracing")]
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let fallback = if verbose { "leadcheck_lib=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(not(feature = "with-tracing"))]
pub fn init_tracing(_verbose: bool) {}

pub fn write_reports(results: &[VerificationResult], cli: &Cli) -> Result<()> {
    match cli.format {
        Format::Human => write_human(results, cli),
        Format::Json => write_json(results, cli),
        Format::Ndjson => write_ndjson(results, cli),
        Format::Csv => write_csv(results, cli),
    }
}

pub fn any_rejected(results: &[VerificationResult]) -> bool {
    results.iter().any(|result| !result.accepted)
}

/// Replaces `path` with the accepted addresses, one per line.
pub fn write_valid_file(results: &[VerificationResult], path: &Path) -> Result<usize> {
    let mut buf = Vec::new();
    let written = write_valid_addresses(results, &mut buf)?;
    write_all_atomically(path, &buf)?;
    Ok(written)
}

fn write_human(results: &[VerificationResult], cli: &Cli) -> Result<()> {
    let formatter: Box<dyn LineFormatter> = if cli.no_color {
        Box::new(PlainFormatter)
    } else {
        Box::new(ColoredFormatter)
    };
    write_report(results, formatter.as_ref(), io::stdout().lock())?;
    Ok(())
}

#[cfg(feature = "with-serde")]
fn write_json(results: &[VerificationResult], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(results)?;
    if let Some(path) = &cli.out {
        write_all_atomically(Path::new(path), s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[VerificationResult], _: &Cli) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(results: &[VerificationResult], cli: &Cli) -> Result<()> {
    let mut buf = Vec::new();
    for result in results {
        serde_json::to_writer(&mut buf, result)?;
        buf.push(b'\n');
    }
    if let Some(path) = &cli.out {
        write_all_atomically(Path::new(path), &buf)?;
    } else {
        io::stdout().lock().write_all(&buf)?;
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[VerificationResult], _: &Cli) -> Result<()> {
    bail!("format=ndjson requires the 'with-serde' feature")
}

#[cfg(feature = "with-csv")]
const CSV_HEADER: [&str; 6] = ["address", "accepted", "status", "reason", "country", "detail"];

#[cfg(feature = "with-csv")]
fn write_csv(results: &[VerificationResult], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for result in results {
            wtr.write_record(csv_record(result))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(Path::new(path), &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        wtr.write_record(CSV_HEADER)?;
        for result in results {
            wtr.write_record(csv_record(result))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[VerificationResult], _: &Cli) -> Result<()> {
    bail!("format=csv requires the 'with-csv' feature")
}

#[cfg(feature = "with-csv")]
fn csv_record(result: &VerificationResult) -> [String; 6] {
    let detail = match &result.status {
        leadcheck_lib::Status::ProbeRejected(rejection) => Some(rejection.to_string()),
        leadcheck_lib::Status::ProbeFailed(failure) => Some(failure.to_string()),
        _ => None,
    };
    let detail = [detail.as_deref(), result.detail.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("; ");
    [
        result.address.clone(),
        result.accepted.to_string(),
        result.status.code().to_string(),
        result.status.reason().to_string(),
        result.country.clone(),
        detail,
    ]
}

fn write_all_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    {
        let mut f = std::fs::File::create(tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
