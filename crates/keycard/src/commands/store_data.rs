//! STORE DATA: write one of the persistent records

use bytes::Bytes;
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::error::Result;

use super::{PersistentRecord, expect_ok};

/// STORE DATA into a record slot
pub struct StoreDataCommand;

impl StoreDataCommand {
    /// Build the command; P1 addresses the record
    pub fn put(record: PersistentRecord, data: &[u8]) -> Command {
        Command::new_with_data(
            CLA_PROPRIETARY,
            ins::STORE_DATA,
            record as u8,
            0x00,
            Bytes::copy_from_slice(data),
        )
    }

    /// Interpret the response
    pub fn parse_response(response: &Response) -> Result<()> {
        expect_ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_addresses_record() {
        let raw = StoreDataCommand::put(PersistentRecord::Ndef, &[0x01, 0x02]).to_bytes();
        assert_eq!(&raw[..4], &[0x80, 0xE2, 0x01, 0x00]);
        assert_eq!(raw[4], 2);
    }
}
