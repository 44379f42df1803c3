//! Serial port transport implementation

use crate::stream::{compensate_echo, log_frame, MeterConnection};
use bytes::{BufMut, BytesMut};
use log::{info, warn};
use meter_core::{MeterResult, TransportError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

/// Carriage return
pub const CR: u8 = 0x0D;
/// Line feed
pub const LF: u8 = 0x0A;

/// Time given to an optical head to settle after the port opened
const OPEN_SETTLE_TIME: Duration = Duration::from_millis(100);

/// Serial port settings
///
/// Built once and handed to [`SerialConnection::new`]; the protocol layer
/// never reads or changes them.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    pub dtr: bool,
    pub rts: bool,
    pub timeout: Duration,
    /// Byte terminating every written and read line
    pub line_terminator: u8,
    /// Drop a response line identical to the request just written
    pub echo_compensation: bool,
}

impl SerialSettings {
    /// Create new serial settings with 8N1 defaults
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            dtr: false,
            rts: false,
            timeout: Duration::from_millis(1000),
            line_terminator: LF,
            echo_compensation: false,
        }
    }

    /// Kamstrup Meter Protocol: 1200 baud 8E2, DTR on, CR-terminated lines.
    ///
    /// 1200 baud is at most 150 bytes/s, so 600 ms covers one response line.
    pub fn kmp(port_name: impl Into<String>) -> Self {
        Self {
            data_bits: DataBits::Eight,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            dtr: true,
            rts: false,
            timeout: Duration::from_millis(600),
            line_terminator: CR,
            ..Self::new(port_name, 1200)
        }
    }

    /// IEC 62056-21 mode A/C: 300 baud 7E1, RTS on, LF-terminated lines.
    ///
    /// 300 baud is at most 37 bytes/s, hence the long timeout.
    pub fn iec(port_name: impl Into<String>) -> Self {
        Self {
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::One,
            dtr: false,
            rts: true,
            timeout: Duration::from_millis(1000),
            line_terminator: LF,
            ..Self::new(port_name, 300)
        }
    }

    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_line_terminator(mut self, terminator: u8) -> Self {
        self.line_terminator = terminator;
        self
    }

    #[must_use]
    pub fn with_echo_compensation(mut self, enabled: bool) -> Self {
        self.echo_compensation = enabled;
        self
    }
}

impl fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data_bits = match self.data_bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        };
        let parity = match self.parity {
            Parity::None => "N",
            Parity::Odd => "O",
            Parity::Even => "E",
        };
        let stop_bits = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        write!(
            f,
            "{} {}{}{}@{}",
            self.port_name, data_bits, parity, stop_bits, self.baud_rate
        )
    }
}

/// Serial port connection to a meter
///
/// The port is opened lazily by the first write and closed by
/// [`MeterConnection::close`] or when the connection is dropped.
pub struct SerialConnection {
    port: Option<Box<dyn SerialPort>>,
    settings: SerialSettings,
    line_count: usize,
}

impl fmt::Debug for SerialConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialConnection")
            .field("settings", &self.settings)
            .field("open", &self.port.is_some())
            .field("line_count", &self.line_count)
            .finish()
    }
}

impl SerialConnection {
    /// Create a new serial connection; nothing is opened yet
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            port: None,
            settings,
            line_count: 0,
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Number of lines read since the connection was created
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Open the port unless it is already open
    pub fn open(&mut self) -> MeterResult<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let port_name = self.settings.port_name.clone();
        let mut port = serialport::new(&port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .parity(self.settings.parity)
            .stop_bits(self.settings.stop_bits)
            .flow_control(self.settings.flow_control)
            .timeout(self.settings.timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::PortNotFound { port: port_name.clone() },
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                    TransportError::PermissionDenied { port: port_name.clone() }
                }
                _ => TransportError::Open {
                    port: port_name.clone(),
                    reason: e.to_string(),
                },
            })?;

        let open_error = |e: serialport::Error| TransportError::Open {
            port: port_name.clone(),
            reason: e.to_string(),
        };
        port.write_data_terminal_ready(self.settings.dtr).map_err(open_error)?;
        port.write_request_to_send(self.settings.rts).map_err(open_error)?;

        std::thread::sleep(OPEN_SETTLE_TIME);

        info!("Opened serial connection {}", self.settings);
        self.port = Some(port);
        Ok(())
    }

    fn port(&mut self) -> MeterResult<&mut Box<dyn SerialPort>> {
        Ok(self.port.as_mut().ok_or(TransportError::NotOpen)?)
    }

    fn write_line(&mut self, request: &[u8]) -> MeterResult<()> {
        self.open()?;
        log_frame("<-", request);

        let terminator = self.settings.line_terminator;
        let port = self.port()?;
        port.write_all(request)?;
        port.write_all(&[terminator])?;
        port.flush()?;
        Ok(())
    }

    fn read_raw_byte(&mut self) -> MeterResult<u8> {
        let port = self.port()?;
        let mut buf = [0u8; 1];
        port.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_line_bytes(&mut self) -> MeterResult<Vec<u8>> {
        self.open()?;
        let terminator = self.settings.line_terminator;
        let line = read_terminated(self.port()?, terminator)?;

        self.line_count += 1;
        log_frame("->", &line);
        Ok(line)
    }
}

impl MeterConnection for SerialConnection {
    fn send_command(&mut self, request: &[u8]) -> MeterResult<Vec<u8>> {
        self.write_line(request)?;
        let response = self.read_line_bytes()?;
        let enabled = self.settings.echo_compensation;
        compensate_echo(request, response, enabled, || self.read_line_bytes())
    }

    fn read_byte(&mut self) -> MeterResult<u8> {
        self.open()?;
        self.read_raw_byte()
    }

    fn read_line(&mut self) -> MeterResult<String> {
        let line = self.read_line_bytes()?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) -> MeterResult<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush() {
                warn!("Failed to flush {} before closing: {}", self.settings.port_name, e);
            }
            info!("Closed serial connection {}", self.settings.port_name);
        }
        Ok(())
    }
}

/// Read bytes up to `terminator`, which is consumed but not returned
///
/// Every other byte is kept, so a CR in front of an LF terminator stays part
/// of the line and is covered by the IEC block check.
pub(crate) fn read_terminated<R: Read + ?Sized>(reader: &mut R, terminator: u8) -> MeterResult<Vec<u8>> {
    let mut line = BytesMut::with_capacity(128);
    let mut buf = [0u8; 1];
    loop {
        reader.read_exact(&mut buf)?;
        if buf[0] == terminator {
            return Ok(line.to_vec());
        }
        line.put_u8(buf[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_core::MeterError;
    use std::io::Cursor;

    #[test]
    fn test_read_terminated_line() {
        let mut reader = Cursor::new(b"0.0(12345678)\n1.20(0009032*kWh)\n".to_vec());
        assert_eq!(read_terminated(&mut reader, LF).unwrap(), b"0.0(12345678)".to_vec());
        assert_eq!(read_terminated(&mut reader, LF).unwrap(), b"1.20(0009032*kWh)".to_vec());
    }

    #[test]
    fn test_read_terminated_keeps_cr_before_lf() {
        let mut reader = Cursor::new(b"/KAM5685-382-OK-10\r\n0.0(12345678)\r\n".to_vec());
        assert_eq!(read_terminated(&mut reader, LF).unwrap(), b"/KAM5685-382-OK-10\r".to_vec());
        assert_eq!(read_terminated(&mut reader, LF).unwrap(), b"0.0(12345678)\r".to_vec());
    }

    #[test]
    fn test_read_terminated_kmp_line() {
        let mut reader = Cursor::new(b"HFE950100002348000023470000000196\r".to_vec());
        let line = read_terminated(&mut reader, CR).unwrap();
        assert_eq!(line, b"HFE950100002348000023470000000196".to_vec());
        assert_eq!(reader.position(), 34);
    }

    #[test]
    fn test_read_terminated_empty_line() {
        let mut reader = Cursor::new(vec![CR]);
        assert!(read_terminated(&mut reader, CR).unwrap().is_empty());
    }

    #[test]
    fn test_read_terminated_without_terminator() {
        let mut reader = Cursor::new(b"HFE95".to_vec());
        assert!(matches!(
            read_terminated(&mut reader, CR),
            Err(MeterError::Transport(TransportError::Io(_)))
        ));
    }

    #[test]
    fn test_kmp_preset() {
        let settings = SerialSettings::kmp("/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 1200);
        assert_eq!(settings.parity, Parity::Even);
        assert_eq!(settings.stop_bits, StopBits::Two);
        assert_eq!(settings.line_terminator, CR);
        assert!(settings.dtr);
        assert!(!settings.rts);
        assert_eq!(settings.to_string(), "/dev/ttyUSB0 8E2@1200");
    }

    #[test]
    fn test_iec_preset() {
        let settings = SerialSettings::iec("/dev/ttyUSB0")
            .with_timeout(Duration::from_millis(700))
            .with_echo_compensation(true);
        assert_eq!(settings.baud_rate, 300);
        assert_eq!(settings.data_bits, DataBits::Seven);
        assert_eq!(settings.line_terminator, LF);
        assert_eq!(settings.timeout, Duration::from_millis(700));
        assert!(settings.echo_compensation);
        assert_eq!(settings.to_string(), "/dev/ttyUSB0 7E1@300");
    }

    #[test]
    fn test_new_connection_is_closed() {
        let mut connection = SerialConnection::new(SerialSettings::kmp("/dev/does-not-exist"));
        assert!(!connection.is_open());
        assert_eq!(connection.line_count(), 0);
        assert!(connection.close().is_ok());
    }

    #[test]
    fn test_missing_port_fails_to_open() {
        let mut connection = SerialConnection::new(SerialSettings::iec("/dev/does-not-exist-meter"));
        let err = connection.send_command(b"/?!").unwrap_err();
        assert!(matches!(err, meter_core::MeterError::Transport(_)));
        assert!(!connection.is_open());
    }
}
