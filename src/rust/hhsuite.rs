//! Profile construction through the hhsuite command line tools.
//!
//! The query is searched against a sequence database with `hhblits` or
//! `hhsearch` to collect an A3M alignment, which `hhmake` then turns into an
//! HHM profile. All intermediate files live in a temporary directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::config::Backend;
use crate::errors::{MapError, MapResult};
use crate::query::{Profile, Sequence};

/// Pseudocount flags passed to `hhmake`
pub const HHMAKE_PSEUDO: [&str; 8] = ["-pcm", "4", "-pca", "2.5", "-pcb", "0.5", "-pcc", "1.0"];

/// Builds query profiles against an hhsuite sequence database
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    /// Backend used to gather the alignment
    pub backend: Backend,
    /// Database path prefix, as given to `-d`
    pub seq_db: PathBuf,
    /// Number of hhblits iterations
    pub iterations: u32,
    /// Threads given to the backend
    pub cpu: usize,
    /// Directory holding the hhsuite executables; `PATH` is used when unset
    pub bin_dir: Option<PathBuf>,
}

impl ProfileBuilder {
    pub fn new<P: Into<PathBuf>>(backend: Backend, seq_db: P) -> Self {
        Self { backend, seq_db: seq_db.into(), iterations: 2, cpu: 1, bin_dir: None }
    }

    /// Set the directory holding the hhsuite executables
    pub fn bin_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    /// Set the number of hhblits iterations
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    fn program(&self, name: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Arguments for the alignment step
    pub fn search_args(&self, fasta: &Path, a3m: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            fasta.into(),
            "-d".into(),
            self.seq_db.clone().into(),
            "-oa3m".into(),
            a3m.into(),
            "-o".into(),
            "/dev/null".into(),
            "-cpu".into(),
            self.cpu.to_string().into(),
        ];
        if self.backend.is_blits() {
            args.push("-n".into());
            args.push(self.iterations.to_string().into());
        }
        args
    }

    /// Arguments for the `hhmake` step
    pub fn hhmake_args(&self, a3m: &Path, hhm: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-i".into(), a3m.into(), "-o".into(), hhm.into()];
        args.extend(HHMAKE_PSEUDO.iter().map(OsString::from));
        args
    }

    /// Build the HHM profile for `sequence`.
    ///
    /// The sequence is written as plain FASTA into the working directory, so
    /// the tools never see compressed or stdin input.
    pub fn build(&self, sequence: &Sequence) -> MapResult<Profile> {
        let workdir = tempfile::tempdir()?;
        let fasta = workdir.path().join("query.fasta");
        let a3m = workdir.path().join("query.a3m");
        let hhm = workdir.path().join("query.hhm");
        std::fs::write(&fasta, sequence.to_fasta())?;

        info!("Building profile for '{}' with {}", sequence.name, self.backend);
        self.run(self.backend.program(), &self.search_args(&fasta, &a3m))?;
        self.run("hhmake", &self.hhmake_args(&a3m, &hhm))?;

        Profile::read(&hhm)
    }

    fn run(&self, tool: &str, args: &[OsString]) -> MapResult<()> {
        let program = self.program(tool);
        debug!("Running {} {:?}", program.display(), args);

        let output = Command::new(&program).args(args).output().map_err(|e| {
            MapError::ProfileBuild {
                tool: tool.to_string(),
                message: format!("could not run {}: {}", program.display(), e),
            }
        })?;

        if !output.status.success() {
            return Err(MapError::ProfileBuild {
                tool: tool.to_string(),
                message: format!(
                    "{} ({})",
                    String::from_utf8_lossy(&output.stderr).trim(),
                    output.status
                ),
            });
        }
        Ok(())
    }
}
