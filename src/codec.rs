//! Compression codecs understood by the converters.
//!
//! Each codec knows its archive extension, its magic signature and how to wrap a
//! byte source in an `async-compression` decoder or a byte sink in an encoder.

use async_compression::tokio::bufread::{BzDecoder, GzipDecoder, XzDecoder};
use async_compression::tokio::write::{BzEncoder, GzipEncoder, XzEncoder};
use async_compression::Level;
use std::fmt;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite};

/// Supported compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Gzip compression (.gz files)
    Gzip,
    /// Bzip2 compression (.bz2 files)
    Bzip2,
    /// XZ compression (.xz files)
    Xz,
}

impl Codec {
    pub const ALL: [Codec; 3] = [Codec::Gzip, Codec::Bzip2, Codec::Xz];

    /// Get human-readable name for the codec
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
        }
    }

    /// Archive extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }

    /// Leading bytes every stream of this codec starts with
    ///
    /// - Gzip: `1f 8b` (RFC 1952)
    /// - Bzip2: `42 5a 68` ("BZh", block size follows)
    /// - XZ: `fd 37 7a 58 5a 00` (XZ format specification)
    pub fn magic(&self) -> &'static [u8] {
        match self {
            Self::Gzip => &[0x1f, 0x8b],
            Self::Bzip2 => &[0x42, 0x5a, 0x68],
            Self::Xz => &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00],
        }
    }

    /// Check whether a path ends with `.<extension>`.
    ///
    /// Matching is on the raw bytes of the file name, so `quotes.csv.gz` is a gzip
    /// path while `quotes.gz.csv` is not, and names that are not valid UTF-8 are
    /// matched the same way.
    pub fn matches_path(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.as_encoded_bytes();
        let ext = self.extension().as_bytes();
        name.len() > ext.len() + 1
            && name.ends_with(ext)
            && name[name.len() - ext.len() - 1] == b'.'
    }

    /// Check that `prefix` begins with this codec's magic bytes
    pub fn has_magic(&self, prefix: &[u8]) -> bool {
        prefix.starts_with(self.magic())
    }

    /// Wrap a raw compressed byte source in the matching decoder.
    ///
    /// Gzip and bzip2 accept concatenated members (as produced by appending);
    /// xz is read as a single stream.
    pub fn decoder<R>(&self, source: R) -> Box<dyn AsyncRead + Unpin + Send>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        match self {
            Self::Gzip => {
                let mut decoder = GzipDecoder::new(source);
                decoder.multiple_members(true);
                Box::new(decoder)
            }
            Self::Bzip2 => {
                let mut decoder = BzDecoder::new(source);
                decoder.multiple_members(true);
                Box::new(decoder)
            }
            Self::Xz => Box::new(XzDecoder::new(source)),
        }
    }

    /// Wrap a byte sink in the matching encoder.
    ///
    /// Gzip is written at best compression and bzip2 at fastest, xz at its
    /// default preset.
    pub fn encoder<W>(&self, sink: W) -> Box<dyn AsyncWrite + Unpin + Send>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        match self {
            Self::Gzip => Box::new(GzipEncoder::with_quality(sink, Level::Best)),
            Self::Bzip2 => Box::new(BzEncoder::with_quality(sink, Level::Fastest)),
            Self::Xz => Box::new(XzEncoder::with_quality(sink, Level::Default)),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detect codec from magic bytes
pub fn detect_by_magic(magic: &[u8]) -> Option<Codec> {
    Codec::ALL.into_iter().find(|codec| codec.has_magic(magic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_gzip_magic() {
        let magic = [0x1f, 0x8b, 0x08, 0x00];
        assert_eq!(detect_by_magic(&magic), Some(Codec::Gzip));
    }

    #[test]
    fn test_detect_bzip2_magic() {
        let magic = [0x42, 0x5a, 0x68, 0x39];
        assert_eq!(detect_by_magic(&magic), Some(Codec::Bzip2));
    }

    #[test]
    fn test_detect_xz_magic() {
        let magic = [0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
        assert_eq!(detect_by_magic(&magic), Some(Codec::Xz));
    }

    #[test]
    fn test_detect_no_codec() {
        assert_eq!(detect_by_magic(b"a,1\n"), None);
        assert_eq!(detect_by_magic(&[0x1f]), None);
        assert_eq!(detect_by_magic(&[]), None);
    }

    #[test]
    fn test_matches_path_requires_a_base_name() {
        assert!(!Codec::Gzip.matches_path(Path::new(".gz")));
        assert!(!Codec::Gzip.matches_path(Path::new("gz")));
        assert!(Codec::Gzip.matches_path(Path::new("a.gz")));
        assert!(!Codec::Gzip.matches_path(Path::new("a.gz.csv")));
        assert!(Codec::Bzip2.matches_path(Path::new("/tmp/data.bz2")));
        assert!(!Codec::Gzip.matches_path(Path::new("data.tgz")));
    }

    #[cfg(unix)]
    #[test]
    fn test_matches_path_accepts_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let gz = Path::new(OsStr::from_bytes(b"/tmp/d\xffata.gz"));
        assert!(Codec::Gzip.matches_path(gz));
        assert!(!Codec::Bzip2.matches_path(gz));

        let plain = Path::new(OsStr::from_bytes(b"d\xffata.csv"));
        assert!(!Codec::Gzip.matches_path(plain));
    }

    #[test]
    fn test_codec_display() {
        assert_eq!(Codec::Bzip2.to_string(), "bzip2");
        assert_eq!(Codec::Xz.extension(), "xz");
    }
}
