use anyhow::{Context, Result};
use std::fs;

pub struct FileUtils {}
impl FileUtils {
    pub fn load(path: &str) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read file: {}", path))
    }
}
