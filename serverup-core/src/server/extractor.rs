//! Decompression of downloaded builds and executable permissions.
//!
//! Builds are published as a single compressed executable, not as an archive.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

// ============================================================================
// Compression Formats
// ============================================================================

/// Compression applied to a published build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Xz,
    /// Published uncompressed; installed as is.
    None,
}

impl Compression {
    /// Infers the compression from an asset name.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".gz") {
            Self::Gzip
        } else if lower.ends_with(".xz") {
            Self::Xz
        } else {
            Self::None
        }
    }
}

/// Writes the decompressed contents of `src` to `dest`.
///
/// `dest` is created or truncated. `src` is left in place.
pub fn decompress(src: &Path, dest: &Path, compression: Compression) -> Result<u64> {
    debug!(
        "Decompressing {:?} {} to {}",
        compression,
        src.display(),
        dest.display()
    );

    let input = File::open(src).with_context(|| format!("Failed to open {}", src.display()))?;
    let reader = BufReader::new(input);

    let mut decoder: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
        Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        Compression::None => Box::new(reader),
    };

    let output =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut writer = BufWriter::new(output);

    let written = io::copy(&mut decoder, &mut writer)
        .with_context(|| format!("Failed to decompress {}", src.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", dest.display()))?;

    Ok(written)
}

// ============================================================================
// Unix Permissions
// ============================================================================

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for {}", path.display()))?;

        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o755);

        fs::set_permissions(path, permissions).with_context(|| {
            format!("Failed to set executable permission on {}", path.display())
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compression_from_name() {
        assert_eq!(Compression::from_name("ls-linux.gz"), Compression::Gzip);
        assert_eq!(Compression::from_name("ls.XZ"), Compression::Xz);
        assert_eq!(Compression::from_name("ls.exe"), Compression::None);
    }

    #[test]
    fn test_decompress_gzip() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("ls.gz");
        let dest = temp.path().join("ls");

        {
            let file = File::create(&src).unwrap();
            let mut encoder =
                flate2::write::GzEncoder::new(file, flate2::Compression::default());
            encoder.write_all(b"#!/bin/sh\necho ok\n").unwrap();
            encoder.finish().unwrap();
        }

        let written = decompress(&src, &dest, Compression::Gzip).unwrap();
        assert_eq!(written, 18);
        assert_eq!(fs::read(&dest).unwrap(), b"#!/bin/sh\necho ok\n");
        assert!(src.exists());
    }

    #[test]
    fn test_decompress_xz() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("ls.xz");
        let dest = temp.path().join("ls");

        {
            let file = File::create(&src).unwrap();
            let mut encoder = xz2::write::XzEncoder::new(file, 6);
            encoder.write_all(b"binary payload").unwrap();
            encoder.finish().unwrap();
        }

        decompress(&src, &dest, Compression::Xz).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"binary payload");
    }

    #[test]
    fn test_decompress_none_copies() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("ls.bin");
        let dest = temp.path().join("ls");
        fs::write(&src, b"raw").unwrap();

        decompress(&src, &dest, Compression::None).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"raw");
    }

    #[test]
    fn test_decompress_corrupt_gzip_fails() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("ls.gz");
        fs::write(&src, b"definitely not gzip").unwrap();

        assert!(decompress(&src, &temp.path().join("ls"), Compression::Gzip).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ls");
        fs::write(&path, b"x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        make_executable(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o755, 0o755);
    }
}
