//! CAN bus modules of an Elster/Stiebel heat pump installation.

use crate::constants::{ELSTER_ADDRESS_NIBBLE_MASK, ELSTER_READ_FLAG, ELSTER_SUB_INDEX_MASK};

/// A physical node on the CAN bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Module {
    pub name: &'static str,
    /// 11-bit base address; the low 3 bits are the sub-index
    pub address: u16,
}

impl Module {
    /// Endpoint nibble shared by the read and write prefix bytes.
    pub fn address_nibble(&self) -> u8 {
        ((self.address >> 3) as u8) & ELSTER_ADDRESS_NIBBLE_MASK
    }

    pub fn read_prefix(&self) -> u8 {
        self.address_nibble() | ELSTER_READ_FLAG
    }

    pub fn write_prefix(&self) -> u8 {
        self.address_nibble()
    }

    pub fn sub_index(&self) -> u8 {
        (self.address & ELSTER_SUB_INDEX_MASK) as u8
    }

    /// Display name of the module's sink device.
    pub fn friendly_name(&self) -> &'static str {
        match self.name {
            "KESSEL" => "Kessel",
            "MANAGER" => "Manager",
            "HEIZMODUL" => "Heizmodul",
            other => other,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == UNKNOWN_MODULE
    }
}

const fn module(name: &'static str, address: u16) -> Module {
    Module { name, address }
}

pub const KESSEL: Module = module("KESSEL", 0x180);
pub const MANAGER: Module = module("MANAGER", 0x480);
pub const HEIZMODUL: Module = module("HEIZMODUL", 0x500);
pub const PC: Module = module("PC", 0x680);

/// Returned for addresses that match no module.
pub const UNKNOWN_MODULE: Module = module("OTHER", 0x000);

pub const MODULES: &[Module] = &[
    KESSEL,
    module("ATEZ", 0x280),
    module("BEDIENMODUL_1", 0x300),
    module("BEDIENMODUL_2", 0x301),
    module("BEDIENMODUL_3", 0x302),
    module("BEDIENMODUL_4", 0x303),
    module("RAUMFERNFUEHLER", 0x400),
    MANAGER,
    HEIZMODUL,
    module("BUSKOPPLER", 0x580),
    module("MISCHERMODUL_1", 0x600),
    module("MISCHERMODUL_2", 0x601),
    module("MISCHERMODUL_3", 0x602),
    module("MISCHERMODUL_4", 0x603),
    PC,
    module("FREMDGERAET", 0x700),
    module("DCF_MODUL", 0x780),
];

/// Modules addressed by an "all members" request row.
pub const ALL_MEMBERS: &[Module] = &[KESSEL, MANAGER, HEIZMODUL];

/// Name of the pseudo-member that expands to [`ALL_MEMBERS`].
pub const ALL_MEMBERS_NAME: &str = "ALL";
