//! IEC readout state machine

use crate::block_check::BlockCheck;
use crate::identification::Identification;
use crate::line_parser::DataLine;
use log::{debug, info, warn};
use meter_core::{MeterError, MeterResult, RegistrationSet};
use meter_transport::MeterConnection;

/// Wake-up request opening a readout
pub const WAKE_UP: &[u8] = b"/?!";
/// Start of text
pub const STX: u8 = 0x02;
/// End of text
pub const ETX: u8 = 0x03;
/// Marker of the last data line
const END_OF_DATA: char = '!';
/// Index of the first data line; the identification line counts as the first
const FIRST_LINE_INDEX: usize = 2;

/// Readout state
///
/// # State Transitions
/// ```text
/// Idle -> AwaitIdentification (wake-up sent, identification parsed)
/// AwaitIdentification -> ReadingData (STX received)
/// ReadingData -> Validate (line containing '!' read, then ETX received)
/// Validate -> Done (block check matches)
/// any -> Failed (on the first error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Idle,
    AwaitIdentification,
    ReadingData,
    Validate,
    Done,
    Failed,
}

impl ReaderState {
    /// Check if the reader stopped, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReaderState::Done | ReaderState::Failed)
    }
}

/// A complete, validated readout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IecTelegram {
    pub identification: Identification,
    pub lines: Vec<DataLine>,
    pub checksum: u8,
}

impl IecTelegram {
    /// Registers of the readout: `MAKE`, `MODEL`, then every data line
    ///
    /// A later line with a repeated code replaces the earlier value.
    pub fn registrations(&self) -> RegistrationSet {
        let mut registrations = RegistrationSet::new();
        registrations.insert("MAKE", self.identification.manufacturer.as_str());
        registrations.insert("MODEL", self.identification.model.as_str());
        for line in &self.lines {
            registrations.insert(line.key.as_str(), line.value.as_str());
        }
        registrations
    }
}

/// Reads one IEC readout from a connection
pub struct IecFrameReader<C: MeterConnection> {
    connection: C,
    state: ReaderState,
    block_check: BlockCheck,
}

impl<C: MeterConnection> IecFrameReader<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            state: ReaderState::Idle,
            block_check: BlockCheck::new(),
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn into_inner(self) -> C {
        self.connection
    }

    /// Run a full readout
    ///
    /// Any failure aborts the readout and leaves the reader in
    /// [`ReaderState::Failed`]; nothing is retried.
    pub fn read(&mut self) -> MeterResult<IecTelegram> {
        self.state = ReaderState::Idle;
        self.block_check.reset();

        let result = self.run();
        if let Err(e) = &result {
            warn!("IEC readout failed in state {:?}: {}", self.state, e);
            self.state = ReaderState::Failed;
        }
        result
    }

    fn run(&mut self) -> MeterResult<IecTelegram> {
        let reply = self.connection.send_command(WAKE_UP)?;
        let identification = Identification::parse(&String::from_utf8_lossy(&reply))?;
        info!(
            "Meter identified as {} {}",
            identification.manufacturer, identification.model
        );
        self.state = ReaderState::AwaitIdentification;

        self.expect_marker(STX, "STX")?;
        self.state = ReaderState::ReadingData;

        let mut lines = Vec::new();
        let mut index = FIRST_LINE_INDEX;
        loop {
            let line = self.connection.read_line()?;
            self.block_check.update_line(&line);
            lines.push(DataLine::parse(&line, index)?);
            index += 1;
            if line.contains(END_OF_DATA) {
                break;
            }
        }
        debug!("Read {} data lines", lines.len());

        self.expect_marker(ETX, "ETX")?;
        self.block_check.update(ETX);
        self.state = ReaderState::Validate;

        let declared = self.connection.read_byte()?;
        let calculated = self.block_check.value();
        if calculated != declared {
            return Err(MeterError::ChecksumMismatch {
                expected: calculated,
                actual: declared,
            });
        }
        info!("Block check 0x{calculated:02X} valid");
        self.state = ReaderState::Done;

        Ok(IecTelegram {
            identification,
            lines,
            checksum: declared,
        })
    }

    fn expect_marker(&mut self, marker: u8, name: &'static str) -> MeterResult<()> {
        let byte = self.connection.read_byte()?;
        if byte != marker {
            debug!("Expected {name} (0x{marker:02X}), got 0x{byte:02X}");
            return Err(MeterError::Framing {
                expected_marker: name,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const IDENTIFICATION: &str = "/KAM5685-382-OK-10";

    pub const DATA_LINES: [&str; 8] = [
        "0.0(12345678)",
        "1.20(0009032*kWh)",
        "1.20.1(0009031*kWh)",
        "1.20.2(0000001*kWh)",
        "1.31(0057342*h)",
        "1.26(0000000)",
        "1.6(000001,5*kW)",
        "1.6*1(000002,8)!",
    ];

    pub const BLOCK_CHECK: u8 = 0x02;

    /// Block check of the same readout sent with CR LF line endings
    pub const CRLF_BLOCK_CHECK: u8 = 0x6A;
}
