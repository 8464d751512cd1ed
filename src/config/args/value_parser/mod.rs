pub mod human_bytes;
pub mod url;
