mod depfile;
mod text_file;

pub use depfile::Depfile;
pub use text_file::{OutputError, update_text_file};
