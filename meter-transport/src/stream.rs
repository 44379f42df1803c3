//! Connection trait for the transport layer

use log::{debug, warn};
use meter_core::byte_ops;
use meter_core::MeterResult;

/// Request/response access to a physically connected meter
///
/// All calls block until the meter answers or the transport's own timeout
/// expires. A connection is used by one protocol driver at a time and
/// commands are never pipelined.
pub trait MeterConnection {
    /// Write `request` followed by the line terminator, then read one line back
    ///
    /// Connections that detect their own transmission echoed back discard
    /// that line and read once more.
    fn send_command(&mut self, request: &[u8]) -> MeterResult<Vec<u8>>;

    /// Read exactly one raw byte
    fn read_byte(&mut self) -> MeterResult<u8>;

    /// Read until the line terminator, which is not included
    fn read_line(&mut self) -> MeterResult<String>;

    /// Check if the underlying port is open
    fn is_open(&self) -> bool;

    /// Close the underlying port
    fn close(&mut self) -> MeterResult<()>;
}

impl<C: MeterConnection + ?Sized> MeterConnection for &mut C {
    fn send_command(&mut self, request: &[u8]) -> MeterResult<Vec<u8>> {
        (**self).send_command(request)
    }

    fn read_byte(&mut self) -> MeterResult<u8> {
        (**self).read_byte()
    }

    fn read_line(&mut self) -> MeterResult<String> {
        (**self).read_line()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) -> MeterResult<()> {
        (**self).close()
    }
}

impl<C: MeterConnection + ?Sized> MeterConnection for Box<C> {
    fn send_command(&mut self, request: &[u8]) -> MeterResult<Vec<u8>> {
        (**self).send_command(request)
    }

    fn read_byte(&mut self) -> MeterResult<u8> {
        (**self).read_byte()
    }

    fn read_line(&mut self) -> MeterResult<String> {
        (**self).read_line()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) -> MeterResult<()> {
        (**self).close()
    }
}

/// Discard a response that is a byte-identical echo of `request`
///
/// Half-duplex optical heads can feed the transmitted line straight back
/// into the receiver. When `enabled`, such a line is dropped and
/// `read_again` is called exactly once.
pub(crate) fn compensate_echo<F>(
    request: &[u8],
    response: Vec<u8>,
    enabled: bool,
    read_again: F,
) -> MeterResult<Vec<u8>>
where
    F: FnOnce() -> MeterResult<Vec<u8>>,
{
    if enabled && byte_ops::equals(&response, request) {
        warn!(
            "Echo/crosstalk detected! Software compensation is being utilized, but for optimal \
             performance, try lowering receiver sensitivity and/or transmitter output power."
        );
        return read_again();
    }
    Ok(response)
}

/// Log a raw frame as hex followed by its ASCII rendering
pub(crate) fn log_frame(direction: &str, data: &[u8]) {
    if log::log_enabled!(log::Level::Debug) {
        let hex: String = data.iter().map(|b| format!(" {:02X}", b)).collect();
        debug!("{}{}\t{}", direction, hex, String::from_utf8_lossy(data));
    }
}
