use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use super::error::SessionError;
use super::types::SmtpReply;

/// Byte stream an SMTP session runs over. The timeout is re-armed before
/// every read and write.
pub(crate) trait Transport: Read + Write {
    fn set_io_timeout(&self, timeout: Duration) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_io_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }
}

/// Longest reply line accepted, CRLF included.
const MAX_REPLY_LINE: u64 = 1024;
/// Most lines accepted in one multiline reply.
const MAX_REPLY_LINES: usize = 64;

/// Re-arms the transport timeout before every read and write, so a peer
/// trickling bytes still runs into the session deadline.
struct Bounded<S> {
    inner: S,
    command_timeout: Duration,
    deadline: Instant,
}

impl<S: Transport> Bounded<S> {
    fn arm(&self) -> io::Result<()> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "session deadline exceeded",
            ));
        }
        self.inner.set_io_timeout(self.command_timeout.min(remaining))
    }
}

impl<S: Transport> Read for Bounded<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm()?;
        self.inner.read(buf)
    }
}

impl<S: Transport> Write for Bounded<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub(crate) struct SmtpSession<S: Transport> {
    host: String,
    reader: BufReader<Bounded<S>>,
    deadline: Instant,
    pub transcript: Vec<String>,
}

impl SmtpSession<TcpStream> {
    /// Connects to the first reachable address. Each attempt is bounded by
    /// `connect_timeout` and by what is left until `deadline`.
    pub(crate) fn connect(
        host: &str,
        addrs: &[SocketAddr],
        connect_timeout: Duration,
        command_timeout: Duration,
        deadline: Instant,
    ) -> Result<(Self, SocketAddr), SessionError> {
        let mut last_err = None;
        for addr in addrs {
            let remaining = remaining_until(deadline)?;
            match TcpStream::connect_timeout(addr, connect_timeout.min(remaining)) {
                Ok(stream) => {
                    let session = Self::new(host, stream, command_timeout, deadline);
                    return Ok((session, *addr));
                }
                Err(err) => last_err = Some(SessionError::io(err)),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            SessionError::io(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            ))
        }))
    }
}

impl<S: Transport> SmtpSession<S> {
    pub(crate) fn new(host: &str, stream: S, command_timeout: Duration, deadline: Instant) -> Self {
        let bounded = Bounded {
            inner: stream,
            command_timeout,
            deadline,
        };
        Self {
            host: host.to_string(),
            reader: BufReader::new(bounded),
            deadline,
            transcript: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> S {
        self.reader.into_inner().inner
    }

    fn record(&mut self, direction: &str, message: &str) {
        log_trace!(host = %self.host, "{direction}: {message}");
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }

    pub(crate) fn send_command(&mut self, command: &str) -> Result<(), SessionError> {
        self.record("C", command);
        remaining_until(self.deadline)?;
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        let stream = self.reader.get_mut();
        stream.write_all(&line).map_err(SessionError::io)?;
        stream.flush().map_err(SessionError::io)
    }

    /// Sends `command` and waits for its reply.
    pub(crate) fn exchange(&mut self, command: &str) -> Result<SmtpReply, SessionError> {
        self.send_command(command)?;
        self.read_reply()
    }

    /// Best-effort `QUIT`; the connection is dropped with the session anyway.
    pub(crate) fn quit(&mut self) {
        if self.send_command("QUIT").is_ok() {
            let _ = self.read_reply();
        }
    }

    pub(crate) fn read_reply(&mut self) -> Result<SmtpReply, SessionError> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            remaining_until(self.deadline)?;
            if message_lines.len() >= MAX_REPLY_LINES {
                return Err(SessionError::protocol(format!(
                    "reply longer than {MAX_REPLY_LINES} lines"
                )));
            }
            let raw = self.read_line()?;
            self.record("S", &raw);

            if raw.len() < 3 || !raw.is_char_boundary(3) {
                return Err(SessionError::protocol(format!(
                    "invalid SMTP reply: '{raw}'"
                )));
            }
            let code_part = &raw[..3];
            let parsed_code = code_part.parse::<u16>().map_err(|_| {
                SessionError::protocol(format!("invalid SMTP status code: '{code_part}'"))
            })?;
            if let Some(existing) = code {
                if existing != parsed_code {
                    return Err(SessionError::protocol(format!(
                        "inconsistent SMTP reply codes: {existing} vs {parsed_code}"
                    )));
                }
            } else {
                code = Some(parsed_code);
            }
            let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
            let text = raw.get(4..).unwrap_or_default().to_string();
            message_lines.push(text);
            if !continuation {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.ok_or_else(|| SessionError::protocol("SMTP reply missing status code"))?,
            message: message_lines.join("\n"),
        })
    }

    /// One line without its CRLF, at most [`MAX_REPLY_LINE`] bytes.
    fn read_line(&mut self) -> Result<String, SessionError> {
        let mut raw = String::new();
        let bytes = (&mut self.reader)
            .take(MAX_REPLY_LINE)
            .read_line(&mut raw)
            .map_err(SessionError::io)?;
        if bytes == 0 {
            return Err(SessionError::io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed while reading reply",
            )));
        }
        if !raw.ends_with('\n') {
            if bytes as u64 >= MAX_REPLY_LINE {
                return Err(SessionError::protocol(format!(
                    "reply line longer than {MAX_REPLY_LINE} bytes"
                )));
            }
            return Err(SessionError::io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-line",
            )));
        }
        raw.pop();
        if raw.ends_with('\r') {
            raw.pop();
        }
        Ok(raw)
    }
}

fn remaining_until(deadline: Instant) -> Result<Duration, SessionError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        Err(SessionError::DeadlineExceeded)
    } else {
        Ok(remaining)
    }
}
