pub mod elf;
pub mod macho;
pub mod pe;

use crate::error::ParseResult;
use crate::fields::FieldMap;
use crate::format::FormatKind;
use crate::reader::HeaderReader;
use std::io::{Read, Seek};

pub trait Header: std::fmt::Debug + Sized {
    /// Format family this header belongs to.
    const FORMAT: FormatKind;

    /// Decodes the header from the start of `reader`.
    ///
    /// All reads are addressed from offset 0 of the source.
    fn from_reader<R: Read + Seek>(reader: &mut HeaderReader<R>) -> ParseResult<Self>;

    /// Renders the decoded fields in fixture order.
    fn fields(&self) -> FieldMap;
}
