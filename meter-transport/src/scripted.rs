//! Scripted virtual meter connection
//!
//! A [`ScriptedConnection`] replays responses captured from a real meter
//! without a port attached. Every request written is recorded, which makes
//! it useful both for reverse-engineering captured traffic and for tests.

use crate::stream::{compensate_echo, log_frame, MeterConnection};
use meter_core::{MeterResult, TransportError};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ScriptedConnection {
    lines: VecDeque<Vec<u8>>,
    bytes: VecDeque<u8>,
    requests: Vec<Vec<u8>>,
    crosstalk: bool,
    echo_compensation: bool,
    open: bool,
    line_count: usize,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line returned by `send_command` or `read_line`
    #[must_use]
    pub fn with_line(mut self, line: impl AsRef<[u8]>) -> Self {
        self.lines.push_back(line.as_ref().to_vec());
        self
    }

    /// Queue several lines, in order
    #[must_use]
    pub fn with_lines<I, L>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        self.lines
            .extend(lines.into_iter().map(|line| line.as_ref().to_vec()));
        self
    }

    /// Queue raw bytes returned by `read_byte`
    #[must_use]
    pub fn with_bytes(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend(bytes.iter().copied());
        self
    }

    /// Feed every request straight back as the first response line,
    /// the way a half-duplex optical head does
    #[must_use]
    pub fn with_crosstalk(mut self, enabled: bool) -> Self {
        self.crosstalk = enabled;
        self
    }

    #[must_use]
    pub fn with_echo_compensation(mut self, enabled: bool) -> Self {
        self.echo_compensation = enabled;
        self
    }

    /// Requests written so far, without line terminators
    pub fn requests(&self) -> &[Vec<u8>] {
        &self.requests
    }

    /// Number of lines read so far
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Check that every queued line and byte has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.lines.is_empty() && self.bytes.is_empty()
    }

    fn next_line(&mut self) -> MeterResult<Vec<u8>> {
        let line = self.lines.pop_front().ok_or(TransportError::Timeout)?;
        self.line_count += 1;
        log_frame("->", &line);
        Ok(line)
    }
}

impl MeterConnection for ScriptedConnection {
    fn send_command(&mut self, request: &[u8]) -> MeterResult<Vec<u8>> {
        self.open = true;
        log_frame("<-", request);
        self.requests.push(request.to_vec());
        if self.crosstalk {
            self.lines.push_front(request.to_vec());
        }

        let response = self.next_line()?;
        let enabled = self.echo_compensation;
        compensate_echo(request, response, enabled, || self.next_line())
    }

    fn read_byte(&mut self) -> MeterResult<u8> {
        self.open = true;
        Ok(self.bytes.pop_front().ok_or(TransportError::Timeout)?)
    }

    fn read_line(&mut self) -> MeterResult<String> {
        self.open = true;
        let line = self.next_line()?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> MeterResult<()> {
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_core::MeterError;

    #[test]
    fn test_replays_in_order() {
        let mut connection = ScriptedConnection::new()
            .with_line("/KAM5685-382-OK-10")
            .with_lines(["0.0(12345678)", "!"])
            .with_bytes(&[0x02, 0x03]);

        assert!(!connection.is_open());
        assert_eq!(connection.send_command(b"/?!").unwrap(), b"/KAM5685-382-OK-10".to_vec());
        assert!(connection.is_open());
        assert_eq!(connection.read_byte().unwrap(), 0x02);
        assert_eq!(connection.read_line().unwrap(), "0.0(12345678)");
        assert_eq!(connection.read_line().unwrap(), "!");
        assert_eq!(connection.read_byte().unwrap(), 0x03);
        assert!(connection.is_exhausted());
        assert_eq!(connection.requests(), &[b"/?!".to_vec()]);
        assert_eq!(connection.line_count(), 3);
    }

    #[test]
    fn test_runs_dry_with_timeout() {
        let mut connection = ScriptedConnection::new();
        assert!(matches!(
            connection.read_byte(),
            Err(MeterError::Transport(TransportError::Timeout))
        ));
        assert!(matches!(
            connection.send_command(b"@FE00"),
            Err(MeterError::Transport(TransportError::Timeout))
        ));
    }

    #[test]
    fn test_crosstalk_compensated() {
        let mut connection = ScriptedConnection::new()
            .with_line("HFE0002")
            .with_crosstalk(true)
            .with_echo_compensation(true);

        assert_eq!(connection.send_command(b"@FE0002").unwrap(), b"HFE0002".to_vec());
        assert!(connection.is_exhausted());
    }

    #[test]
    fn test_crosstalk_without_compensation_returns_echo() {
        let mut connection = ScriptedConnection::new()
            .with_line("HFE0002")
            .with_crosstalk(true);

        assert_eq!(connection.send_command(b"@FE0002").unwrap(), b"@FE0002".to_vec());
        assert!(!connection.is_exhausted());
    }

    #[test]
    fn test_close() {
        let mut connection = ScriptedConnection::new().with_line("x");
        connection.read_line().unwrap();
        assert!(connection.is_open());
        connection.close().unwrap();
        assert!(!connection.is_open());
    }
}
