use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::errors::DataError;

pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("gz"))
}

/// Fails with `NotFound` unless `path` is an existing file.
pub fn ensure_exists(path: &Path) -> Result<(), DataError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DataError::NotFound(path.to_path_buf()))
    }
}

/// Fails with `AlreadyExists` when anything is present at `path`.
pub fn ensure_absent(path: &Path) -> Result<(), DataError> {
    if path.exists() {
        Err(DataError::AlreadyExists(path.to_path_buf()))
    } else {
        Ok(())
    }
}

/// Reads a whole input file, decompressing `.gz` paths.
pub fn read_input(path: &Path) -> Result<Vec<u8>, DataError> {
    let file = File::open(path).map_err(|source| DataError::io(path, source))?;
    let mut reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).map_err(|source| DataError::io(path, source))?;
    Ok(buffer)
}

/// Output sink created with create-new semantics, gzip-encoded for `.gz` paths.
pub enum OutputFile {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputFile {
    pub fn create(path: &Path) -> Result<Self, DataError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| DataError::io(path, source))?;

        let writer = BufWriter::new(file);
        Ok(if is_gzip(path) {
            Self::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            Self::Plain(writer)
        })
    }

    pub fn finish(self) -> io::Result<()> {
        match self {
            Self::Plain(mut writer) => writer.flush(),
            Self::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(writer) => writer.write(buf),
            Self::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(writer) => writer.flush(),
            Self::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Creates `path`, runs `write` against it and finishes the stream. A failed
/// write removes the partial file.
pub fn write_output<F>(path: &Path, write: F) -> Result<(), DataError>
where
    F: FnOnce(&mut OutputFile) -> Result<(), DataError>,
{
    let mut output = OutputFile::create(path)?;
    let written = write(&mut output)
        .and_then(|()| output.finish().map_err(|source| DataError::io(path, source)));

    if written.is_err() {
        let _ = fs::remove_file(path);
    }
    written
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use tempfile::TempDir;

    use crate::errors::DataError;
    use crate::files::{ensure_absent, ensure_exists, read_input, write_output};

    #[test]
    fn gzip_output_reads_back_transparently() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("rows.tsv.gz");

        write_output(&path, |output| {
            output
                .write_all(b"user\titem\n")
                .map_err(|source| DataError::Io { path: path.clone(), source })
        })
        .expect("write gzip");

        let raw = fs::read(&path).expect("raw bytes");
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert_eq!(read_input(&path).expect("decode"), b"user\titem\n");
    }

    #[test]
    fn existing_output_is_never_truncated() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("out.json");
        fs::write(&path, "keep").expect("seed");

        let result = write_output(&path, |_| Ok(()));

        assert!(matches!(result, Err(DataError::AlreadyExists(_))));
        assert!(matches!(ensure_absent(&path), Err(DataError::AlreadyExists(_))));
        assert_eq!(fs::read_to_string(&path).expect("read"), "keep");
    }

    #[test]
    fn failed_write_removes_the_partial_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("out.json");

        let result = write_output(&path, |_| {
            Err(DataError::EmptyInput(std::path::PathBuf::from("upstream")))
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn missing_input_is_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.csv");

        assert!(matches!(ensure_exists(&path), Err(DataError::NotFound(_))));
        assert!(matches!(read_input(&path), Err(DataError::NotFound(_))));
    }
}
