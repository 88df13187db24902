use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).map_err(|e| Error::fs(p, e))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut f = File::open(path).map_err(|e| Error::fs(path, e))?;
    let mut h = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = f.read(&mut buf).map_err(|e| Error::fs(path, e))?;
        if n == 0 {
            break;
        }
        h.update(&buf[..n]);
    }
    Ok(format!("{:x}", h.finalize()))
}

/// Copies the regular files directly under `src` into `dst`, optionally
/// leaving out empty ones. Returns how many files were copied.
pub fn copy_source_files(src: &Path, dst: &Path, skip_empty: bool) -> Result<usize> {
    let mut copied = 0;
    for entry in std::fs::read_dir(src).map_err(|e| Error::fs(src, e))? {
        let entry = entry.map_err(|e| Error::fs(src, e))?;
        let meta = entry.metadata().map_err(|e| Error::fs(entry.path(), e))?;
        if !meta.is_file() || (skip_empty && meta.len() == 0) {
            continue;
        }
        let target = dst.join(entry.file_name());
        std::fs::copy(entry.path(), &target).map_err(|e| Error::fs(&target, e))?;
        copied += 1;
    }
    Ok(copied)
}
