use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;

/// Byte-for-byte copy of everything received from the device.
///
/// A capture can be fed back through the same pipeline later with `replay`.
pub struct RawCapture {
    path: PathBuf,
    file: File,
    bytes: u64,
}

impl RawCapture {
    pub fn create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create `{}`", parent.display()))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Unable to create capture `{}`", path.display()))?;

        info!("Capturing raw stream to {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file,
            bytes: 0,
        })
    }

    pub fn append(&mut self, chunk: &[u8]) -> anyhow::Result<()> {
        self.file
            .write_all(chunk)
            .and_then(|_| self.file.flush())
            .with_context(|| format!("Unable to write capture `{}`", self.path.display()))?;
        self.bytes += chunk.len() as u64;
        Ok(())
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}
