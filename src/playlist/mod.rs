//! M3U playlist parsing and serialization

pub mod parser;
pub mod writer;

pub use parser::PlaylistParser;
pub use writer::write_playlist;
