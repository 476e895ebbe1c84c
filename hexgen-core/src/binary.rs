use crate::error::ParseResult;
use crate::fields::FieldMap;
use crate::format::{FormatKind, MAGIC_LEN};
use crate::header::elf::ElfHeaders;
use crate::header::macho::MachHeader;
use crate::header::pe::PeHeader;
use crate::header::Header;
use crate::reader::HeaderReader;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

/// Result of parsing one executable: its format and rendered header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub format: FormatKind,
    pub fields: FieldMap,
}

fn decode<H: Header, R: Read + Seek>(reader: &mut HeaderReader<R>) -> ParseResult<Binary> {
    let header = H::from_reader(reader)?;
    Ok(Binary {
        format: H::FORMAT,
        fields: header.fields(),
    })
}

impl Binary {
    /// Parses an in-memory image. `Ok(None)` means the magic matched no
    /// supported format and the input should be skipped.
    pub fn parse(data: &[u8]) -> ParseResult<Option<Self>> {
        let format = FormatKind::sniff(data);
        let mut reader = HeaderReader::from_bytes(data);
        Self::dispatch(format, &mut reader)
    }

    /// Parses the file at `path`.
    ///
    /// PE and Mach-O headers are read straight from the file handle. ELF
    /// files are loaded whole first since the header tables can sit anywhere
    /// in the file.
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Option<Self>> {
        let mut file = File::open(&path)?;
        let mut magic = Vec::with_capacity(MAGIC_LEN);
        (&mut file).take(MAGIC_LEN as u64).read_to_end(&mut magic)?;

        let format = FormatKind::sniff(&magic);
        match format {
            FormatKind::Elf => {
                let mut buf = Vec::new();
                file.rewind()?;
                file.read_to_end(&mut buf)?;
                let mut reader = HeaderReader::new(Cursor::new(buf))?;
                Self::dispatch(format, &mut reader)
            }
            FormatKind::Pe | FormatKind::MachO => {
                let mut reader = HeaderReader::new(BufReader::new(file))?;
                Self::dispatch(format, &mut reader)
            }
            FormatKind::Unknown => Ok(None),
        }
    }

    fn dispatch<R: Read + Seek>(
        format: FormatKind,
        reader: &mut HeaderReader<R>,
    ) -> ParseResult<Option<Self>> {
        let binary = match format {
            FormatKind::Pe => decode::<PeHeader, _>(reader)?,
            FormatKind::Elf => decode::<ElfHeaders, _>(reader)?,
            FormatKind::MachO => decode::<MachHeader, _>(reader)?,
            FormatKind::Unknown => return Ok(None),
        };
        Ok(Some(binary))
    }
}
