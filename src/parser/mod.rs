mod error;
pub use error::ParserError;

mod line;
pub use line::{Line, LineError, LineReader};

mod content_line;
pub use content_line::{ContentLine, ContentLineError, ContentLineParams, ContentLineParser};

mod component;
pub use component::{ComponentParser, OpaqueComponent, RawComponent, RawProperty};
