use crate::error::{ParseError, ParseResult};
use crate::fields::FieldMap;
use crate::format::FormatKind;
use crate::header::Header;
use crate::reader::HeaderReader;
use goblin::pe::header::{COFF_MACHINE_X86, PE_MAGIC, SIZEOF_COFF_HEADER, SIZEOF_PE_MAGIC};
use goblin::pe::optional_header::MAGIC_32;
use std::fmt;
use std::io::{Read, Seek};

/// Offset of `e_lfanew` in the MS-DOS stub.
pub const E_LFANEW_OFFSET: u64 = 0x3c;
pub const PE_SIGNATURE_LEN: usize = SIZEOF_PE_MAGIC;
/// Optional header starts after the signature and the COFF header.
pub const OPTIONAL_HEADER_DELTA: u64 = (PE_SIGNATURE_LEN + SIZEOF_COFF_HEADER) as u64;

// COFF header, relative to its own start.
const COFF_MACHINE: u64 = 0;
const COFF_NUMBER_OF_SECTIONS: u64 = 2;
const COFF_SIZE_OF_OPTIONAL_HEADER: u64 = 16;

// PE32 optional header, relative to its own start.
const OPT_MAGIC: u64 = 0;
const OPT_ADDRESS_OF_ENTRY_POINT: u64 = 16;
const OPT_BASE_OF_CODE: u64 = 20;
const OPT_BASE_OF_DATA: u64 = 24;
const OPT_IMAGE_BASE: u64 = 28;
const OPT_SECTION_ALIGNMENT: u64 = 32;
const OPT_FILE_ALIGNMENT: u64 = 36;
const OPT_SIZE_OF_IMAGE: u64 = 56;
const OPT_SIZE_OF_HEADERS: u64 = 60;
const OPT_CHECKSUM: u64 = 64;
const OPT_SUBSYSTEM: u64 = 68;
const OPT_DLL_CHARACTERISTICS: u64 = 70;

/// Coarse architecture label: only i386 is told apart, everything else
/// (AMD64, ARM, ARM64, ...) is reported as `x64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86,
    X64,
}

impl Architecture {
    pub fn from_machine(machine: u16) -> Self {
        if machine == COFF_MACHINE_X86 {
            Architecture::X86
        } else {
            Architecture::X64
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86 => write!(f, "x86"),
            Architecture::X64 => write!(f, "x64"),
        }
    }
}

/// Header summary of a PE image.
///
/// Optional header fields are always read with the PE32 layout, even when
/// the magic says PE32+; fixtures produced from 64-bit images therefore
/// carry PE32-positioned values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeHeader {
    pub pe_offset: u32,
    pub machine: u16,
    pub number_of_sections: u16,
    pub size_of_optional_header: u16,
    pub optional_magic: u16,
    pub entry_point: u32,
    pub base_of_code: u32,
    pub base_of_data: u32,
    pub image_base: u32,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
}

impl PeHeader {
    pub fn architecture(&self) -> Architecture {
        Architecture::from_machine(self.machine)
    }

    pub fn is_pe32(&self) -> bool {
        self.optional_magic == MAGIC_32
    }
}

impl Header for PeHeader {
    const FORMAT: FormatKind = FormatKind::Pe;

    fn from_reader<R: Read + Seek>(reader: &mut HeaderReader<R>) -> ParseResult<Self> {
        let pe_offset = reader.u32_at(E_LFANEW_OFFSET)?;
        log::debug!("PE offset: {pe_offset}");
        let pe_base = pe_offset as u64;

        let signature = reader.bytes_up_to(pe_base, PE_SIGNATURE_LEN)?;
        log::debug!("PE signature: {signature:02x?}");
        if signature != PE_MAGIC.to_le_bytes() {
            return Err(ParseError::InvalidSignature {
                observed: signature,
            });
        }

        let coff = pe_base + PE_SIGNATURE_LEN as u64;
        reader.require(coff, SIZEOF_COFF_HEADER)?;
        let machine = reader.u16_at(coff + COFF_MACHINE)?;
        let number_of_sections = reader.u16_at(coff + COFF_NUMBER_OF_SECTIONS)?;
        let size_of_optional_header = reader.u16_at(coff + COFF_SIZE_OF_OPTIONAL_HEADER)?;
        log::debug!(
            "Machine: {machine:#x}, Sections: {number_of_sections}, Optional Header Size: {size_of_optional_header}"
        );

        let opt = pe_base + OPTIONAL_HEADER_DELTA;
        let optional_magic = reader.u16_at(opt + OPT_MAGIC)?;
        if optional_magic != MAGIC_32 {
            log::debug!(
                "Optional header magic {optional_magic:#x} is not PE32, reading PE32 layout anyway"
            );
        }

        let header = PeHeader {
            pe_offset,
            machine,
            number_of_sections,
            size_of_optional_header,
            optional_magic,
            entry_point: reader.u32_at(opt + OPT_ADDRESS_OF_ENTRY_POINT)?,
            base_of_code: reader.u32_at(opt + OPT_BASE_OF_CODE)?,
            base_of_data: reader.u32_at(opt + OPT_BASE_OF_DATA)?,
            image_base: reader.u32_at(opt + OPT_IMAGE_BASE)?,
            section_alignment: reader.u32_at(opt + OPT_SECTION_ALIGNMENT)?,
            file_alignment: reader.u32_at(opt + OPT_FILE_ALIGNMENT)?,
            size_of_image: reader.u32_at(opt + OPT_SIZE_OF_IMAGE)?,
            size_of_headers: reader.u32_at(opt + OPT_SIZE_OF_HEADERS)?,
            checksum: reader.u32_at(opt + OPT_CHECKSUM)?,
            subsystem: reader.u16_at(opt + OPT_SUBSYSTEM)?,
            dll_characteristics: reader.u16_at(opt + OPT_DLL_CHARACTERISTICS)?,
        };
        log::debug!("{header:#x?}");
        Ok(header)
    }

    fn fields(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("architecture", self.architecture().to_string());
        map.insert_hex("checksum", self.checksum);
        map.insert_hex("entry_point", self.entry_point);
        map.insert_hex("size_of_image", self.size_of_image);
        // Two-digit uppercase, no prefix. Existing fixtures depend on it.
        map.insert(
            "number_of_sections",
            format!("{:02X}", self.number_of_sections),
        );
        map.insert_hex("section_alignment", self.section_alignment);
        map.insert_hex("file_alignment", self.file_alignment);
        map.insert_hex("base_of_code", self.base_of_code);
        map.insert_hex("base_of_data", self.base_of_data);
        map.insert_hex("image_base", self.image_base);
        map.insert_hex("size_of_headers", self.size_of_headers);
        map.insert_hex("subsystem", self.subsystem);
        map.insert_hex("dll_characteristics", self.dll_characteristics);
        map
    }
}
