use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use leadcheck_lib::smtp_verify::DEFAULT_ENVELOPE_SENDER;
use leadcheck_lib::{MxPolicy, ProbeOptions, VerifyOptions};

#[derive(Parser, Debug)]
#[command(name = "leadcheck-cli", version, about = "Bulk e-mail lead verification")]
pub struct Cli {
    /// file with one address per line (prompted for when omitted)
    pub file: Option<PathBuf>,

    /// read addresses from stdin (one per line)
    #[arg(long, conflicts_with = "file")]
    pub stdin: bool,

    /// where accepted addresses are written
    #[arg(long, default_value = "valid_emails.txt")]
    pub valid_out: PathBuf,

    /// report format
    #[arg(long, value_enum, default_value_t = Format::Human)]
    pub format: Format,

    /// write report to file (JSON/NDJSON/CSV per --format)
    #[arg(long)]
    pub out: Option<String>,

    /// plain human report, no ANSI colors
    #[arg(long)]
    pub no_color: bool,

    /// SMTP port on the mail exchanger
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// name announced in EHLO/HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// MAIL FROM envelope sender
    #[arg(long = "from", default_value = DEFAULT_ENVELOPE_SENDER)]
    pub mail_from: String,

    /// mx policy: first|priority
    #[arg(long, default_value = "first")]
    pub mx_policy: String,

    /// maximum exchangers tried with --mx-policy priority
    #[arg(long, default_value_t = 3)]
    pub max_mx: usize,

    /// TCP connect timeout (ms)
    #[arg(long, default_value_t = 10_000)]
    pub connect_timeout: u64,

    /// per SMTP command timeout (ms)
    #[arg(long, default_value_t = 10_000)]
    pub command_timeout: u64,

    /// whole SMTP session timeout per exchanger (ms)
    #[arg(long, default_value_t = 30_000)]
    pub session_timeout: u64,

    /// per DNS query timeout (ms)
    #[arg(long, default_value_t = 5_000)]
    pub dns_timeout: u64,

    /// worker threads (default: min(32, cpus + 4))
    #[arg(long)]
    pub workers: Option<usize>,

    /// debug logs on stderr (with-tracing builds)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
    Ndjson,
    Csv,
}

impl Format {
    /// Fails when this build lacks the feature the format is written with.
    pub fn ensure_available(self) -> Result<()> {
        match self {
            Self::Json if !cfg!(feature = "with-serde") => {
                bail!("format=json requires the 'with-serde' feature")
            }
            Self::Ndjson if !cfg!(feature = "with-serde") => {
                bail!("format=ndjson requires the 'with-serde' feature")
            }
            Self::Csv if !cfg!(feature = "with-csv") => {
                bail!("format=csv requires the 'with-csv' feature")
            }
            _ => Ok(()),
        }
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Checks every flag before any network work starts.
    pub fn verify_options(&self) -> Result<VerifyOptions> {
        self.format.ensure_available()?;
        if self.workers == Some(0) {
            bail!("--workers must be at least 1");
        }
        let probe = ProbeOptions {
            port: self.port,
            helo_domain: self.helo.clone(),
            envelope_sender: self.mail_from.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout),
            command_timeout: Duration::from_millis(self.command_timeout),
            session_timeout: Duration::from_millis(self.session_timeout),
            mx_policy: mx_policy_from_str(&self.mx_policy)?,
            max_servers: self.max_mx,
        };
        Ok(VerifyOptions {
            probe,
            dns_timeout: Some(Duration::from_millis(self.dns_timeout)),
            workers: self.workers,
        })
    }
}

pub fn mx_policy_from_str(s: &str) -> Result<MxPolicy> {
    match s {
        "first" => Ok(MxPolicy::FirstOnly),
        "priority" => Ok(MxPolicy::PriorityOrdered),
        other => bail!("unknown --mx-policy '{other}', use: first|priority"),
    }
}
