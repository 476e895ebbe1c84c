use crate::error::ParseResult;
use crate::fields::FieldMap;
use crate::format::FormatKind;
use crate::header::Header;
use crate::reader::HeaderReader;
use goblin::mach::header::SIZEOF_HEADER_32;
use std::io::{Read, Seek};

/// 32-bit Mach-O header: magic followed by six u32 fields.
///
/// Fields are always read little-endian. For a file starting with
/// `fe ed fa ce` the values therefore come out byte-swapped, and `magic`
/// itself reads as `0xcefaedfe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachHeader {
    pub magic: u32,
    pub cputype: u32,
    pub cpusubtype: u32,
    pub filetype: u32,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
}

impl Header for MachHeader {
    const FORMAT: FormatKind = FormatKind::MachO;

    fn from_reader<R: Read + Seek>(reader: &mut HeaderReader<R>) -> ParseResult<Self> {
        reader.require(0, SIZEOF_HEADER_32)?;

        let header = MachHeader {
            magic: reader.u32_at(0)?,
            cputype: reader.u32_at(4)?,
            cpusubtype: reader.u32_at(8)?,
            filetype: reader.u32_at(12)?,
            ncmds: reader.u32_at(16)?,
            sizeofcmds: reader.u32_at(20)?,
            flags: reader.u32_at(24)?,
        };
        log::debug!("{header:#x?}");
        Ok(header)
    }

    fn fields(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert_hex("magic", self.magic);
        map.insert_hex("cputype", self.cputype);
        map.insert_hex("cpusubtype", self.cpusubtype);
        map.insert_hex("filetype", self.filetype);
        map.insert_hex("ncmds", self.ncmds);
        map.insert_hex("sizeofcmds", self.sizeofcmds);
        map.insert_hex("flags", self.flags);
        map
    }
}
