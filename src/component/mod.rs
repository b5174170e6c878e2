//! The calendar object model and the assembler between it and raw blocks.

mod incidence;
pub use incidence::*;

mod alarm;
pub use alarm::*;

pub(crate) mod assemble;
pub use assemble::{parse_component, serialize_component};

mod occurrences;
