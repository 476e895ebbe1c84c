use goblin::elf::header::ELFMAG;
use goblin::mach::header::{MH_CIGAM, MH_MAGIC};
use goblin::pe::header::DOS_MAGIC;
use std::fmt;

/// Number of leading bytes the sniffer looks at.
pub const MAGIC_LEN: usize = 4;

/// Executable format family, decided once from a file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormatKind {
    Pe,
    Elf,
    MachO,
    Unknown,
}

impl FormatKind {
    /// Classifies a file by its first (up to four) bytes.
    ///
    /// `MZ` only needs two bytes, the ELF and Mach-O magics need all four.
    /// The three patterns start with different bytes, so at most one matches.
    pub fn sniff(magic: &[u8]) -> Self {
        let head = &magic[..magic.len().min(MAGIC_LEN)];

        if head.starts_with(&DOS_MAGIC.to_le_bytes()) {
            FormatKind::Pe
        } else if head == ELFMAG {
            FormatKind::Elf
        } else if head == MH_MAGIC.to_be_bytes() || head == MH_CIGAM.to_be_bytes() {
            FormatKind::MachO
        } else {
            FormatKind::Unknown
        }
    }

    /// Table name used for this format in a report, `None` for `Unknown`.
    pub fn table_name(&self) -> Option<&'static str> {
        match self {
            FormatKind::Pe => Some("pe"),
            FormatKind::Elf => Some("elf"),
            FormatKind::MachO => Some("macho"),
            FormatKind::Unknown => None,
        }
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        match name {
            "pe" => Some(FormatKind::Pe),
            "elf" => Some(FormatKind::Elf),
            "macho" => Some(FormatKind::MachO),
            _ => None,
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatKind::Pe => "PE",
            FormatKind::Elf => "ELF",
            FormatKind::MachO => "Mach-O",
            FormatKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}
