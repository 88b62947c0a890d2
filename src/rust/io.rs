//! Input handling for query FASTA and profile files.
//!
//! Every reader returned here transparently decompresses gzip, bzip2, xz and
//! zstd input, so `query.fasta.gz` and `query.hhm.zst` work wherever a plain
//! file does. The path `-` means stdin.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use crate::errors::MapResult;

/// Opens a file, decompressing it if needed.
///
/// # Examples
/// ```no_run
/// use fragmap::io::open_maybe_compressed;
/// use std::io::BufRead;
///
/// let reader = open_maybe_compressed("query.fasta.gz")?;
/// for line in reader.lines() {
///     let _line = line?;
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn open_maybe_compressed<P: AsRef<Path>>(path: P) -> MapResult<Box<dyn BufRead>> {
    let file = File::open(path)?;
    // niffler autodetects gzip/bzip2/xz/zstd/uncompressed
    let (reader, _format) =
        niffler::get_reader(Box::new(file)).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(Box::new(BufReader::new(reader)))
}

/// A buffered reader over stdin
pub fn stdin_reader() -> Box<dyn BufRead> {
    Box::new(BufReader::new(io::stdin()))
}

/// Opens `path`, or stdin when `path` is `-`
pub fn open_input<P: AsRef<Path>>(path: P) -> MapResult<Box<dyn BufRead>> {
    if is_stdin(path.as_ref()) {
        Ok(stdin_reader())
    } else {
        open_maybe_compressed(path)
    }
}

/// Reads a whole (possibly compressed) input into a string
pub fn read_input_to_string<P: AsRef<Path>>(path: P) -> MapResult<String> {
    let mut reader = open_input(path)?;
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}
