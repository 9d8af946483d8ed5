mod reader;
mod types;
mod writer;

pub use reader::ResultReader;
pub use types::*;
pub use writer::ResultWriter;
