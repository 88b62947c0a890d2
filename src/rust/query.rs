use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use bio::io::fasta;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{MapError, MapResult};
use crate::io::{open_input, read_input_to_string};
use crate::residues::normalize_protein;
use crate::types::Window;

/// A named protein sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    residues: Vec<u8>,
}

impl Sequence {
    /// Create a sequence, validating and normalizing its residues
    pub fn new(name: &str, residues: &[u8]) -> MapResult<Self> {
        Ok(Self { name: name.to_string(), residues: normalize_protein(residues)? })
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    /// Residues covered by `window`, or `None` if it runs past the end
    pub fn window(&self, window: Window) -> Option<&[u8]> {
        self.residues.get(window.start..window.end)
    }

    /// FASTA text for this sequence, wrapped at 60 columns
    pub fn to_fasta(&self) -> String {
        let mut out = String::with_capacity(self.len() + self.len() / 60 + self.name.len() + 4);
        let _ = writeln!(out, ">{}", self.name);
        for line in self.residues.chunks(60) {
            // residues are normalized ASCII
            out.push_str(&String::from_utf8_lossy(line));
            out.push('\n');
        }
        out
    }
}

/// Reads a FASTA file that must contain exactly one sequence
pub fn read_one_fasta<P: AsRef<Path>>(path: P) -> MapResult<Sequence> {
    let path = path.as_ref();
    let reader = fasta::Reader::from_bufread(open_input(path)?);

    let mut sequences = Vec::with_capacity(1);
    for record in reader.records() {
        let record = record.map_err(|e| MapError::Fasta {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        record.check().map_err(|message| MapError::Fasta {
            path: path.to_path_buf(),
            message: message.to_string(),
        })?;

        let name = match record.desc() {
            Some(desc) => format!("{} {}", record.id(), desc),
            None => record.id().to_string(),
        };
        sequences.push(Sequence::new(&name, record.seq())?);
    }

    match sequences.len() {
        0 => Err(MapError::NoSequences(path.to_path_buf())),
        1 => Ok(sequences.remove(0)),
        count => Err(MapError::MultipleSequences { count, path: path.to_path_buf() }),
    }
}

/// An hhsuite HHM profile.
///
/// Only the header is inspected: the format line, `NAME` and `LENG`. The
/// matrix itself is handed to the search backend untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    name: String,
    length: Option<usize>,
    text: String,
}

impl Profile {
    /// Read an HHM file (optionally compressed)
    pub fn read<P: AsRef<Path>>(path: P) -> MapResult<Self> {
        let path = path.as_ref();
        let text = read_input_to_string(path)?;
        Self::from_hhm_text(text, path)
    }

    /// Check the HHM header of `text`; `origin` is used in error messages
    pub fn from_hhm_text(text: String, origin: &Path) -> MapResult<Self> {
        let malformed = |message: &str| MapError::Profile {
            path: origin.to_path_buf(),
            message: message.to_string(),
        };

        let mut lines = text.lines().skip_while(|line| line.trim().is_empty());
        match lines.next() {
            Some(first) if first.starts_with("HHsearch") => {}
            _ => return Err(malformed("missing 'HHsearch' format line")),
        }

        let mut name = None;
        let mut length = None;
        for line in lines {
            if let Some(rest) = line.strip_prefix("NAME") {
                name = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("LENG") {
                let leng = rest.split_whitespace().next().and_then(|n| n.parse().ok());
                if leng.is_none() {
                    return Err(malformed("unreadable LENG line"));
                }
                length = leng;
            } else if line.starts_with("HMM") || line.starts_with('#') {
                break;
            }
        }

        let name = name.ok_or_else(|| malformed("missing NAME line"))?;
        if !text.lines().any(|line| line.trim_end() == "//") {
            return Err(malformed("missing '//' terminator"));
        }

        Ok(Self { name, length, text })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of match states, if the header declares it
    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// A query sequence and its profile, shared read-only by all search workers
#[derive(Debug, Clone)]
pub struct Query {
    pub sequence: Sequence,
    pub profile: Profile,
}

impl Query {
    pub fn new(sequence: Sequence, profile: Profile) -> Self {
        if let Some(length) = profile.length() {
            if length != sequence.len() {
                warn!(
                    "Profile '{}' has {} match states but sequence '{}' has {} residues",
                    profile.name(),
                    length,
                    sequence.name,
                    sequence.len()
                );
            }
        }
        Self { sequence, profile }
    }

    /// Load the sequence from `fasta` and a precomputed profile from `hhm`
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(fasta: P, hhm: Q) -> MapResult<Self> {
        let sequence = read_one_fasta(fasta)?;
        let profile = Profile::read(hhm)?;
        debug!("Loaded query '{}' ({} residues)", sequence.name, sequence.len());
        Ok(Self::new(sequence, profile))
    }

    /// Load the sequence from `fasta`, then its profile from `source`.
    ///
    /// The sequence is read first so a bad FASTA file fails before any
    /// profile is built.
    pub fn load<P: AsRef<Path>>(fasta: P, source: &ProfileSource) -> MapResult<Self> {
        let sequence = read_one_fasta(fasta)?;
        let profile = source.load(&sequence)?;
        Ok(Self::new(sequence, profile))
    }

    pub fn name(&self) -> &str {
        &self.sequence.name
    }
}

/// Where the query's profile comes from
#[derive(Debug, Clone)]
pub enum ProfileSource {
    /// A precomputed HHM file
    File(PathBuf),
    /// Built with hhsuite against a sequence database
    Build(crate::hhsuite::ProfileBuilder),
}

impl ProfileSource {
    /// Read or build the profile for `sequence`
    pub fn load(&self, sequence: &Sequence) -> MapResult<Profile> {
        match self {
            ProfileSource::File(path) => Profile::read(path),
            ProfileSource::Build(builder) => builder.build(sequence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) const TEST_HHM: &str = "HHsearch 1.5\nNAME  test_query\nLENG  12 match states, 12 columns in multiple alignment\nHMM    A\tC\n#\n//\n";

    fn fasta_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_one_fasta() -> MapResult<()> {
        let file = fasta_file(">test_query some protein\nMKLLILTCLV\nAVALARPKHP\n");
        let sequence = read_one_fasta(file.path())?;
        assert_eq!(sequence.name, "test_query some protein");
        assert_eq!(sequence.len(), 20);
        assert_eq!(sequence.window(Window::new(10, 5)), Some(&b"AVALA"[..]));
        assert_eq!(sequence.window(Window::new(18, 5)), None);
        Ok(())
    }

    #[test]
    fn test_read_empty_fasta() {
        let file = fasta_file("");
        assert!(matches!(read_one_fasta(file.path()), Err(MapError::NoSequences(_))));
    }

    #[test]
    fn test_read_multiple_sequences() {
        let file = fasta_file(">test_protein1\nPLANTANDANIMALGENQMES\n>test_protein2\nLIVINGALIVE\n");
        match read_one_fasta(file.path()) {
            Err(MapError::MultipleSequences { count, .. }) => assert_eq!(count, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_invalid_residue() {
        let file = fasta_file(">bad\nPLANTANDANIMALGEN1MES\n");
        assert!(matches!(read_one_fasta(file.path()), Err(MapError::InvalidResidue('1', 17))));
    }

    #[test]
    fn test_to_fasta_wraps() -> MapResult<()> {
        let residues = "A".repeat(130);
        let sequence = Sequence::new("long", residues.as_bytes())?;
        let fasta = sequence.to_fasta();
        let lines: Vec<_> = fasta.lines().collect();
        assert_eq!(lines[0], ">long");
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[3].len(), 10);
        Ok(())
    }

    #[test]
    fn test_profile_header() -> MapResult<()> {
        let profile = Profile::from_hhm_text(TEST_HHM.to_string(), Path::new("q.hhm"))?;
        assert_eq!(profile.name(), "test_query");
        assert_eq!(profile.length(), Some(12));
        Ok(())
    }

    #[test]
    fn test_profile_malformed() {
        let origin = Path::new("q.hhm");
        assert!(Profile::from_hhm_text("NAME x\n//\n".to_string(), origin).is_err());
        assert!(Profile::from_hhm_text("HHsearch 1.5\nLENG 3\n//\n".to_string(), origin).is_err());
        assert!(Profile::from_hhm_text("HHsearch 1.5\nNAME x\n".to_string(), origin).is_err());
        assert!(
            Profile::from_hhm_text("HHsearch 1.5\nNAME x\nLENG many\n//\n".to_string(), origin)
                .is_err()
        );
    }

    #[test]
    fn test_query_from_files() -> MapResult<()> {
        let fasta = fasta_file(">test_query\nMKLLILTCLVAV\n");
        let hhm = fasta_file(TEST_HHM);
        let query = Query::from_files(fasta.path(), hhm.path())?;
        assert_eq!(query.name(), "test_query");
        assert_eq!(query.profile.length(), Some(query.sequence.len()));
        Ok(())
    }
}
