pub mod batch;
pub mod binary;
pub mod error;
pub mod fields;
pub mod format;
pub mod header;
pub mod reader;
pub mod report;
pub mod verify;

pub use binary::*;
pub use error::{ParseError, ParseResult};
pub use fields::FieldMap;
pub use format::FormatKind;
pub use report::{OutputFormat, Report};
