//! IEC protocol driver

use crate::frame_reader::{IecFrameReader, IecTelegram};
use log::info;
use meter_core::{MeterProtocol, MeterResult, RegistrationSet};
use meter_transport::MeterConnection;

/// Reads the data block of a meter speaking IEC 62056-21
#[derive(Debug)]
pub struct IecProtocol<C: MeterConnection> {
    connection: C,
}

impl<C: MeterConnection> IecProtocol<C> {
    pub fn new(connection: C) -> Self {
        info!("Instantiated IEC protocol");
        Self { connection }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn into_inner(self) -> C {
        self.connection
    }

    /// Run one readout and return it unflattened
    pub fn read_telegram(&mut self) -> MeterResult<IecTelegram> {
        IecFrameReader::new(&mut self.connection).read()
    }
}

impl<C: MeterConnection> MeterProtocol for IecProtocol<C> {
    fn name(&self) -> &'static str {
        "IEC"
    }

    fn all_registrations(&mut self) -> MeterResult<RegistrationSet> {
        let registrations = self.read_telegram()?.registrations();
        info!("Read {} IEC registrations", registrations.len());
        Ok(registrations)
    }
}
