//! GET DATA: read one of the persistent records

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::error::Result;

use super::{PersistentRecord, expect_success};

/// GET DATA from a record slot
pub struct GetDataCommand;

impl GetDataCommand {
    /// Build the command; P1 addresses the record
    pub fn get(record: PersistentRecord) -> Command {
        Command::new(CLA_PROPRIETARY, ins::GET_DATA, record as u8, 0x00).with_le(0)
    }

    /// The stored bytes, verbatim
    pub fn parse_response(response: &Response) -> Result<Vec<u8>> {
        Ok(expect_success(response)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        let raw = GetDataCommand::get(PersistentRecord::Cashcard).to_bytes();
        assert_eq!(raw.as_ref(), &[0x80, 0xCA, 0x02, 0x00, 0x00]);
    }
}
