use crate::error::{Error, Result};
use flate2::{Compression, write::GzEncoder};
use std::fs::File;
use std::path::Path;

/// Packs the contents of `root` into a gzip-compressed tar at `out`, with
/// entry names relative to `root`.
pub fn write_tar_gz(root: &Path, out: &Path) -> Result<()> {
    let file = File::create(out).map_err(|e| Error::fs(out, e))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);
    builder
        .append_dir_all(".", root)
        .map_err(|e| Error::fs(root, e))?;
    let encoder = builder.into_inner().map_err(|e| Error::fs(out, e))?;
    encoder.finish().map_err(|e| Error::fs(out, e))?;
    Ok(())
}
