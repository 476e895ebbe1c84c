use crate::error::{ParseError, ParseResult};
use crate::fields::FieldMap;
use crate::format::FormatKind;
use crate::header::Header;
use crate::reader::HeaderReader;
use goblin::elf::header::SIZEOF_IDENT;
use std::io::{Read, Seek};

/// Number of program headers and section headers captured per file.
pub const MAX_CAPTURED_ENTRIES: u16 = 2;

// Elf64_Ehdr field offsets.
const E_TYPE: u64 = 16;
const E_MACHINE: u64 = 18;
const E_VERSION: u64 = 20;
const E_ENTRY: u64 = 24;
const E_PHOFF: u64 = 32;
const E_SHOFF: u64 = 40;
const E_FLAGS: u64 = 48;
const E_EHSIZE: u64 = 52;
const E_PHENTSIZE: u64 = 54;
const E_PHNUM: u64 = 56;
const E_SHENTSIZE: u64 = 58;
const E_SHNUM: u64 = 60;
const E_SHSTRNDX: u64 = 62;

// Elf64_Word and Elf64_Xword/Addr/Off widths.
const WORD: usize = 4;
const XWORD: usize = 8;

// Elf64_Phdr field offsets, relative to the entry.
const P_TYPE: u64 = 0;
const P_FLAGS: u64 = 4;
const P_OFFSET: u64 = 8;
const P_VADDR: u64 = 16;
const P_PADDR: u64 = 24;
const P_FILESZ: u64 = 32;
const P_MEMSZ: u64 = 40;
const P_ALIGN: u64 = 48;

// Elf64_Shdr field offsets, relative to the entry.
const SH_NAME: u64 = 0;
const SH_TYPE: u64 = 4;
const SH_FLAGS: u64 = 8;
const SH_ADDR: u64 = 16;
const SH_OFFSET: u64 = 24;
const SH_SIZE: u64 = 32;
const SH_LINK: u64 = 40;
const SH_INFO: u64 = 44;
const SH_ADDRALIGN: u64 = 48;
const SH_ENTSIZE: u64 = 56;

/// Represents the ELF (Executable and Linkable Format) header for a 64-bit object file.
///
/// This structure corresponds to the standard `Elf64_Ehdr` defined in the ELF specification.
/// It appears at the very beginning of every ELF file and contains metadata describing
/// the file's organization and layout.
///
/// The 64-bit layout is used for every file regardless of `EI_CLASS`, so the
/// fields of a 32-bit object come out shifted. Fixtures rely on that.
///
/// Reference: [ELF Specification v1.2](https://refspecs.linuxfoundation.org/elf/elf.pdf)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf64Ehdr {
    /// ELF identification bytes (magic number and other information).
    ///
    /// The first 4 bytes should be `0x7F`, `'E'`, `'L'`, `'F'`.
    /// Remaining bytes encode class (32/64-bit), endianness, and version.
    pub e_ident: [u8; SIZEOF_IDENT],

    /// Object file type (e.g. relocatable, executable, shared, core).
    ///
    /// Common values:
    /// - `ET_NONE` (0): No file type
    /// - `ET_REL` (1): Relocatable file
    /// - `ET_EXEC` (2): Executable file
    /// - `ET_DYN` (3): Shared object
    /// - `ET_CORE` (4): Core dump
    pub e_type: u16,

    /// Target architecture (e.g., x86_64, ARM).
    ///
    /// Common values:
    /// - `EM_X86_64` (62)
    /// - `EM_AARCH64` (183)
    pub e_machine: u16,

    /// ELF version (usually set to `EV_CURRENT` = 1).
    pub e_version: u32,

    /// Virtual address of the program entry point.
    pub e_entry: u64,

    /// File offset of the program header table.
    ///
    /// Points to an array of `Elf64Phdr` entries.
    pub e_phoff: u64,

    /// File offset of the section header table.
    ///
    /// Points to an array of `Elf64Shdr` entries.
    pub e_shoff: u64,

    /// Processor-specific flags.
    pub e_flags: u32,

    /// Size of this ELF header (usually `64` bytes for ELF64).
    pub e_ehsize: u16,

    /// Size of one entry in the program header table.
    pub e_phentsize: u16,

    /// Number of entries in the program header table.
    pub e_phnum: u16,

    /// Size of one entry in the section header table.
    pub e_shentsize: u16,

    /// Number of entries in the section header table.
    pub e_shnum: u16,

    /// Index of the section header string table.
    pub e_shstrndx: u16,
}

impl Elf64Ehdr {
    pub fn from_reader<R: Read + Seek>(reader: &mut HeaderReader<R>) -> ParseResult<Self> {
        Ok(Elf64Ehdr {
            e_ident: reader.array_at::<SIZEOF_IDENT>(0)?,
            e_type: reader.u16_at(E_TYPE)?,
            e_machine: reader.u16_at(E_MACHINE)?,
            e_version: reader.u32_at(E_VERSION)?,
            e_entry: reader.u64_at(E_ENTRY)?,
            e_phoff: reader.u64_at(E_PHOFF)?,
            e_shoff: reader.u64_at(E_SHOFF)?,
            e_flags: reader.u32_at(E_FLAGS)?,
            e_ehsize: reader.u16_at(E_EHSIZE)?,
            e_phentsize: reader.u16_at(E_PHENTSIZE)?,
            e_phnum: reader.u16_at(E_PHNUM)?,
            e_shentsize: reader.u16_at(E_SHENTSIZE)?,
            e_shnum: reader.u16_at(E_SHNUM)?,
            e_shstrndx: reader.u16_at(E_SHSTRNDX)?,
        })
    }

    /// Identification block rendered as `0x` followed by lowercase hex.
    pub fn ident_hex(&self) -> String {
        format!("0x{}", hex::encode(self.e_ident))
    }
}

/// Program header entry (`Elf64_Phdr`), describing one segment.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf64Phdr {
    /// Segment type (`PT_LOAD`, `PT_DYNAMIC`, ...).
    pub p_type: u32,
    /// Segment permissions (`PF_R`, `PF_W`, `PF_X`).
    pub p_flags: u32,
    /// File offset of the segment contents.
    pub p_offset: u64,
    /// Virtual address of the segment in memory.
    pub p_vaddr: u64,
    /// Physical address, where relevant.
    pub p_paddr: u64,
    /// Bytes occupied in the file.
    pub p_filesz: u64,
    /// Bytes occupied in memory.
    pub p_memsz: u64,
    /// Required alignment.
    pub p_align: u64,
}

impl Elf64Phdr {
    pub fn from_reader<R: Read + Seek>(
        reader: &mut HeaderReader<R>,
        base: u64,
    ) -> ParseResult<Self> {
        Ok(Elf64Phdr {
            p_type: reader.u32_at(field_offset(base, P_TYPE, WORD)?)?,
            p_flags: reader.u32_at(field_offset(base, P_FLAGS, WORD)?)?,
            p_offset: reader.u64_at(field_offset(base, P_OFFSET, XWORD)?)?,
            p_vaddr: reader.u64_at(field_offset(base, P_VADDR, XWORD)?)?,
            p_paddr: reader.u64_at(field_offset(base, P_PADDR, XWORD)?)?,
            p_filesz: reader.u64_at(field_offset(base, P_FILESZ, XWORD)?)?,
            p_memsz: reader.u64_at(field_offset(base, P_MEMSZ, XWORD)?)?,
            p_align: reader.u64_at(field_offset(base, P_ALIGN, XWORD)?)?,
        })
    }

    fn write_fields(&self, prefix: &str, map: &mut FieldMap) {
        map.insert_hex(format!("{prefix}p_type"), self.p_type);
        map.insert_hex(format!("{prefix}p_flags"), self.p_flags);
        map.insert_hex(format!("{prefix}p_offset"), self.p_offset);
        map.insert_hex(format!("{prefix}p_vaddr"), self.p_vaddr);
        map.insert_hex(format!("{prefix}p_paddr"), self.p_paddr);
        map.insert_hex(format!("{prefix}p_filesz"), self.p_filesz);
        map.insert_hex(format!("{prefix}p_memsz"), self.p_memsz);
        map.insert_hex(format!("{prefix}p_align"), self.p_align);
    }
}

/// Section header entry (`Elf64_Shdr`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf64Shdr {
    /// Offset of the section name in the section header string table.
    pub sh_name: u32,
    /// Section type (`SHT_PROGBITS`, `SHT_SYMTAB`, ...).
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

impl Elf64Shdr {
    pub fn from_reader<R: Read + Seek>(
        reader: &mut HeaderReader<R>,
        base: u64,
    ) -> ParseResult<Self> {
        Ok(Elf64Shdr {
            sh_name: reader.u32_at(field_offset(base, SH_NAME, WORD)?)?,
            sh_type: reader.u32_at(field_offset(base, SH_TYPE, WORD)?)?,
            sh_flags: reader.u64_at(field_offset(base, SH_FLAGS, XWORD)?)?,
            sh_addr: reader.u64_at(field_offset(base, SH_ADDR, XWORD)?)?,
            sh_offset: reader.u64_at(field_offset(base, SH_OFFSET, XWORD)?)?,
            sh_size: reader.u64_at(field_offset(base, SH_SIZE, XWORD)?)?,
            sh_link: reader.u32_at(field_offset(base, SH_LINK, WORD)?)?,
            sh_info: reader.u32_at(field_offset(base, SH_INFO, WORD)?)?,
            sh_addralign: reader.u64_at(field_offset(base, SH_ADDRALIGN, XWORD)?)?,
            sh_entsize: reader.u64_at(field_offset(base, SH_ENTSIZE, XWORD)?)?,
        })
    }

    fn write_fields(&self, prefix: &str, map: &mut FieldMap) {
        map.insert_hex(format!("{prefix}sh_name"), self.sh_name);
        map.insert_hex(format!("{prefix}sh_type"), self.sh_type);
        map.insert_hex(format!("{prefix}sh_flags"), self.sh_flags);
        map.insert_hex(format!("{prefix}sh_addr"), self.sh_addr);
        map.insert_hex(format!("{prefix}sh_offset"), self.sh_offset);
        map.insert_hex(format!("{prefix}sh_size"), self.sh_size);
        map.insert_hex(format!("{prefix}sh_link"), self.sh_link);
        map.insert_hex(format!("{prefix}sh_info"), self.sh_info);
        map.insert_hex(format!("{prefix}sh_addralign"), self.sh_addralign);
        map.insert_hex(format!("{prefix}sh_entsize"), self.sh_entsize);
    }
}

/// Absolute offset of a `width`-byte field `delta` bytes into an entry.
fn field_offset(base: u64, delta: u64, width: usize) -> ParseResult<u64> {
    base.checked_add(delta)
        .ok_or_else(|| ParseError::truncated(base, width, 0))
}

/// Offset of entry `index` in a table at `table_offset` with `entry_size`
/// bytes per entry.
fn entry_offset(table_offset: u64, index: u16, entry_size: u16) -> ParseResult<u64> {
    (index as u64)
        .checked_mul(entry_size as u64)
        .and_then(|delta| table_offset.checked_add(delta))
        .ok_or_else(|| ParseError::truncated(table_offset, entry_size as usize, 0))
}

/// ELF file header plus the first (at most two) program and section headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfHeaders {
    pub ehdr: Elf64Ehdr,
    pub program_headers: Vec<Elf64Phdr>,
    pub section_headers: Vec<Elf64Shdr>,
}

impl Header for ElfHeaders {
    const FORMAT: FormatKind = FormatKind::Elf;

    fn from_reader<R: Read + Seek>(reader: &mut HeaderReader<R>) -> ParseResult<Self> {
        let ehdr = Elf64Ehdr::from_reader(reader)?;
        log::debug!("{ehdr:#x?}");

        let ph_count = ehdr.e_phnum.min(MAX_CAPTURED_ENTRIES);
        let mut program_headers = Vec::with_capacity(ph_count as usize);
        for i in 0..ph_count {
            let base = entry_offset(ehdr.e_phoff, i, ehdr.e_phentsize)?;
            let phdr = Elf64Phdr::from_reader(reader, base)?;
            log::debug!("Program header {} at {base:#x}: {phdr:#x?}", i + 1);
            program_headers.push(phdr);
        }

        let sh_count = ehdr.e_shnum.min(MAX_CAPTURED_ENTRIES);
        let mut section_headers = Vec::with_capacity(sh_count as usize);
        for i in 0..sh_count {
            let base = entry_offset(ehdr.e_shoff, i, ehdr.e_shentsize)?;
            let shdr = Elf64Shdr::from_reader(reader, base)?;
            log::debug!("Section header {} at {base:#x}: {shdr:#x?}", i + 1);
            section_headers.push(shdr);
        }

        Ok(ElfHeaders {
            ehdr,
            program_headers,
            section_headers,
        })
    }

    fn fields(&self) -> FieldMap {
        let h = &self.ehdr;
        let mut map = FieldMap::new();
        map.insert("ident", h.ident_hex());
        map.insert_hex("elf_type", h.e_type);
        map.insert_hex("e_machine", h.e_machine);
        map.insert_hex("e_version", h.e_version);
        map.insert_hex("e_entry", h.e_entry);
        map.insert_hex("e_phoff", h.e_phoff);
        map.insert_hex("e_shoff", h.e_shoff);
        map.insert_hex("e_flags", h.e_flags);
        map.insert_hex("e_ehsize", h.e_ehsize);
        map.insert_hex("e_phentsize", h.e_phentsize);
        map.insert_hex("e_phnum", h.e_phnum);
        map.insert_hex("e_shentsize", h.e_shentsize);
        map.insert_hex("e_shnum", h.e_shnum);
        map.insert_hex("e_shstrndx", h.e_shstrndx);

        for (idx, phdr) in self.program_headers.iter().enumerate() {
            phdr.write_fields(&format!("p{}_", idx + 1), &mut map);
        }
        for (idx, shdr) in self.section_headers.iter().enumerate() {
            shdr.write_fields(&format!("sh{}_", idx + 1), &mut map);
        }
        map
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const EHDR_SIZE: usize = 64;
    const PHDR_SIZE: u16 = 56;
    const SHDR_SIZE: u16 = 64;

    /// Builds an ELF64 image with `phnum` program headers right after the
    /// file header and `shnum` section headers after those.
    pub(crate) fn sample_elf(phnum: u16, shnum: u16) -> Vec<u8> {
        let phoff = EHDR_SIZE as u64;
        let shoff = phoff + phnum as u64 * PHDR_SIZE as u64;

        let mut buf = vec![0u8; EHDR_SIZE];
        buf[0..4].copy_from_slice(b"\x7fELF");
        buf[4] = 2; // ELFCLASS64
        buf[5] = 1; // ELFDATA2LSB
        buf[6] = 1; // EV_CURRENT
        buf[16..18].copy_from_slice(&2u16.to_le_bytes());
        buf[18..20].copy_from_slice(&62u16.to_le_bytes());
        buf[20..24].copy_from_slice(&1u32.to_le_bytes());
        buf[24..32].copy_from_slice(&0x401000u64.to_le_bytes());
        if phnum > 0 {
            buf[32..40].copy_from_slice(&phoff.to_le_bytes());
        }
        if shnum > 0 {
            buf[40..48].copy_from_slice(&shoff.to_le_bytes());
        }
        buf[52..54].copy_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
        buf[54..56].copy_from_slice(&PHDR_SIZE.to_le_bytes());
        buf[56..58].copy_from_slice(&phnum.to_le_bytes());
        buf[58..60].copy_from_slice(&SHDR_SIZE.to_le_bytes());
        buf[60..62].copy_from_slice(&shnum.to_le_bytes());
        buf[62..64].copy_from_slice(&shnum.saturating_sub(1).to_le_bytes());

        for i in 0..phnum as u64 {
            let mut ph = vec![0u8; PHDR_SIZE as usize];
            ph[0..4].copy_from_slice(&1u32.to_le_bytes());
            ph[4..8].copy_from_slice(&5u32.to_le_bytes());
            ph[8..16].copy_from_slice(&(i * 0x1000).to_le_bytes());
            ph[16..24].copy_from_slice(&(0x400000 + i * 0x1000).to_le_bytes());
            ph[24..32].copy_from_slice(&(0x400000 + i * 0x1000).to_le_bytes());
            ph[32..40].copy_from_slice(&0x200u64.to_le_bytes());
            ph[40..48].copy_from_slice(&0x300u64.to_le_bytes());
            ph[48..56].copy_from_slice(&0x1000u64.to_le_bytes());
            buf.extend_from_slice(&ph);
        }

        for i in 0..shnum as u64 {
            let mut sh = vec![0u8; SHDR_SIZE as usize];
            sh[0..4].copy_from_slice(&((i as u32) * 8).to_le_bytes());
            sh[4..8].copy_from_slice(&3u32.to_le_bytes());
            sh[8..16].copy_from_slice(&(0x2 + i).to_le_bytes());
            sh[16..24].copy_from_slice(&(0x600000 + i).to_le_bytes());
            sh[24..32].copy_from_slice(&(0x100 * i).to_le_bytes());
            sh[32..40].copy_from_slice(&0x40u64.to_le_bytes());
            sh[40..44].copy_from_slice(&7u32.to_le_bytes());
            sh[44..48].copy_from_slice(&9u32.to_le_bytes());
            sh[48..56].copy_from_slice(&0x10u64.to_le_bytes());
            sh[56..64].copy_from_slice(&0x18u64.to_le_bytes());
            buf.extend_from_slice(&sh);
        }
        buf
    }

    fn parse(data: &[u8]) -> ParseResult<ElfHeaders> {
        ElfHeaders::from_reader(&mut HeaderReader::from_bytes(data))
    }

    fn count_prefixed(fields: &FieldMap, prefix: char) -> usize {
        let mut groups: Vec<&str> = fields
            .keys()
            .filter(|k| {
                k.starts_with(prefix) && k.as_bytes().get(1).is_some_and(u8::is_ascii_digit)
            })
            .filter_map(|k| k.split('_').next())
            .collect();
        groups.dedup();
        groups.len()
    }

    #[test]
    fn zeroed_header_has_no_entries() {
        let mut data = vec![0u8; 64];
        data[0..4].copy_from_slice(b"\x7fELF");
        let headers = parse(&data).unwrap();
        let fields = headers.fields();

        assert_eq!(fields.len(), 14);
        assert_eq!(
            fields.get("ident"),
            Some("0x7f454c46000000000000000000000000")
        );
        for (key, value) in fields.iter().skip(1) {
            assert_eq!(value, "0x0", "{key}");
        }
        assert!(!fields
            .keys()
            .any(|k| k.starts_with('p') || k.starts_with("sh")));
    }

    #[test]
    fn captures_at_most_two_entries() {
        for (phnum, shnum) in [(0, 0), (1, 0), (0, 1), (1, 1), (2, 2), (5, 9)] {
            let headers = parse(&sample_elf(phnum, shnum)).unwrap();
            assert_eq!(headers.program_headers.len(), phnum.min(2) as usize);
            assert_eq!(headers.section_headers.len(), shnum.min(2) as usize);

            let fields = headers.fields();
            assert_eq!(count_prefixed(&fields, 'p'), phnum.min(2) as usize);
            assert_eq!(
                fields.len(),
                14 + 8 * phnum.min(2) as usize + 10 * shnum.min(2) as usize
            );
        }
    }

    #[test]
    fn entry_fields_follow_computed_offsets() {
        let headers = parse(&sample_elf(3, 3)).unwrap();
        let fields = headers.fields();

        assert_eq!(fields.get("e_phoff"), Some("0x40"));
        assert_eq!(fields.get("e_shoff"), Some("0xe8"));
        assert_eq!(fields.get("p1_p_offset"), Some("0x0"));
        assert_eq!(fields.get("p2_p_offset"), Some("0x1000"));
        assert_eq!(fields.get("p2_p_vaddr"), Some("0x401000"));
        assert_eq!(fields.get("p1_p_flags"), Some("0x5"));
        assert_eq!(fields.get("sh1_sh_name"), Some("0x0"));
        assert_eq!(fields.get("sh2_sh_name"), Some("0x8"));
        assert_eq!(fields.get("sh2_sh_addr"), Some("0x600001"));
        assert_eq!(fields.get("sh2_sh_link"), Some("0x7"));
        assert_eq!(fields.get("sh2_sh_entsize"), Some("0x18"));
        assert!(!fields.contains_key("p3_p_type"));
        assert!(!fields.contains_key("sh3_sh_name"));
    }

    #[test]
    fn entry_keys_are_grouped_in_order() {
        let fields = parse(&sample_elf(1, 1)).unwrap().fields();
        let keys: Vec<_> = fields.keys().skip(14).collect();
        assert_eq!(
            keys,
            [
                "p1_p_type",
                "p1_p_flags",
                "p1_p_offset",
                "p1_p_vaddr",
                "p1_p_paddr",
                "p1_p_filesz",
                "p1_p_memsz",
                "p1_p_align",
                "sh1_sh_name",
                "sh1_sh_type",
                "sh1_sh_flags",
                "sh1_sh_addr",
                "sh1_sh_offset",
                "sh1_sh_size",
                "sh1_sh_link",
                "sh1_sh_info",
                "sh1_sh_addralign",
                "sh1_sh_entsize",
            ]
        );
    }

    #[test]
    fn thirty_two_bit_class_still_uses_64_bit_layout() {
        let mut data = sample_elf(0, 0);
        data[4] = 1; // ELFCLASS32
        let headers = parse(&data).unwrap();
        assert_eq!(headers.ehdr.e_entry, 0x401000);
        assert_eq!(headers.ehdr.e_ident[4], 1);
    }

    #[test]
    fn short_file_header_is_truncated() {
        let data = &sample_elf(0, 0)[..40];
        assert!(parse(data).unwrap_err().is_truncation());
    }

    #[test]
    fn program_table_past_end_is_truncated() {
        let mut data = sample_elf(2, 0);
        data.truncate(64 + 56 + 20);
        match parse(&data) {
            Err(ParseError::TruncatedHeader { at_offset, .. }) => assert!(at_offset >= 64 + 56),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn huge_table_offset_is_truncated() {
        let mut data = sample_elf(1, 0);
        data[32..40].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(parse(&data).unwrap_err().is_truncation());
    }

    #[test]
    fn overflowing_field_offset_reports_field_width() {
        match field_offset(u64::MAX - 2, P_OFFSET, XWORD) {
            Err(ParseError::TruncatedHeader {
                at_offset,
                needed,
                available,
            }) => {
                assert_eq!(at_offset, u64::MAX - 2);
                assert_eq!(needed, 8);
                assert_eq!(available, 0);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
        assert_eq!(field_offset(0x40, SH_ENTSIZE, XWORD).unwrap(), 0x78);
    }

    #[test]
    fn zero_entry_size_rereads_first_entry() {
        let mut data = sample_elf(2, 0);
        data[54..56].copy_from_slice(&0u16.to_le_bytes());
        let headers = parse(&data).unwrap();
        assert_eq!(headers.program_headers[0], headers.program_headers[1]);
    }
}
