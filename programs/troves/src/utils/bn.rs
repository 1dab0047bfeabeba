#![allow(clippy::assign_op_pattern)]
#![allow(clippy::ptr_offset_with_cast)]
#![allow(clippy::manual_range_contains)]

use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize};
use uint::construct_uint;

construct_uint! {
    pub struct U256(4);
}

// Little endian limbs, the same layout the in-memory value uses
impl AnchorSerialize for U256 {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AnchorDeserialize for U256 {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(U256(<[u64; 4]>::deserialize_reader(reader)?))
    }
}
