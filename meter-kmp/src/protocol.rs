//! KMP protocol driver

use crate::frame::KmpFrame;
use crate::register_map::{
    FetchCommandSpec, HELLO, REGISTRATION_COMMANDS, SECONDARY_IDENTIFICATION,
};
use log::info;
use meter_core::{MeterProtocol, MeterResult, RegistrationSet};
use meter_transport::MeterConnection;

const HELLO_COMMAND: FetchCommandSpec = FetchCommandSpec {
    name: "HELLO",
    request: HELLO,
    fields: &[],
};

/// Reads registers from a meter speaking the Kamstrup Meter Protocol
///
/// The driver owns its connection for the duration of every call and sends
/// one fetch command at a time, waiting for each response.
#[derive(Debug)]
pub struct KmpProtocol<C: MeterConnection> {
    connection: C,
}

impl<C: MeterConnection> KmpProtocol<C> {
    pub fn new(connection: C) -> Self {
        info!("Instantiated KMP protocol");
        Self { connection }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Release the connection
    pub fn into_inner(self) -> C {
        self.connection
    }

    /// Run one fetch command and decode its fields
    pub fn fetch(&mut self, command: &FetchCommandSpec) -> MeterResult<RegistrationSet> {
        command.execute(&mut self.connection)
    }

    /// Exchange the handshake frame and return the validated reply
    pub fn hello(&mut self) -> MeterResult<KmpFrame> {
        HELLO_COMMAND.exchange(&mut self.connection)
    }

    /// Issue the secondary identification request and validate the reply
    ///
    /// No registers are taken from this response yet; a successful
    /// exchange confirms the link is in step.
    pub fn probe_secondary_identification(&mut self) -> MeterResult<()> {
        SECONDARY_IDENTIFICATION.exchange(&mut self.connection)?;
        Ok(())
    }
}

impl<C: MeterConnection> MeterProtocol for KmpProtocol<C> {
    fn name(&self) -> &'static str {
        "KMP"
    }

    fn all_registrations(&mut self) -> MeterResult<RegistrationSet> {
        let mut registrations = RegistrationSet::new();
        for command in REGISTRATION_COMMANDS {
            registrations = registrations.merge(self.fetch(command)?);
        }
        info!("Read {} KMP registrations", registrations.len());
        Ok(registrations)
    }
}
