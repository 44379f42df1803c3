//! Protocol facade shared by all meter protocol drivers

use crate::error::MeterResult;
use crate::registration::RegistrationSet;

/// A logical meter protocol driver
///
/// Implementations own (or borrow) one connection and read every register
/// they know about in a single call. The call issues its commands strictly
/// sequentially; any error aborts it and no partial result is returned.
pub trait MeterProtocol {
    /// Short protocol name used in log output
    fn name(&self) -> &'static str;

    /// Read all available registrations
    ///
    /// # Errors
    /// Returns the first checksum, framing, format or transport error met.
    fn all_registrations(&mut self) -> MeterResult<RegistrationSet>;
}
