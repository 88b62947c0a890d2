use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use log::trace;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::Backend;
use crate::query::{Profile, Sequence};
use crate::types::{Coords, Window};

/// A structural fragment from the database matched to a query window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Identifier of the matched template (e.g. PDB chain)
    pub template: String,
    /// Alignment probability reported by the backend
    pub probability: f64,
    /// CA backbone atoms of the matched template region
    pub ca_atoms: Vec<Coords>,
}

/// Fragments found for one query window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragments {
    /// First residue of the window
    pub start: usize,
    /// One past the last residue of the window
    pub end: usize,
    /// Quality of the whole window; higher is better
    pub score: f64,
    /// Matched fragments, in backend rank order
    pub frags: Vec<Fragment>,
}

impl Fragments {
    pub fn new(window: Window, score: f64, frags: Vec<Fragment>) -> Self {
        Self { start: window.start, end: window.end, score, frags }
    }

    pub fn window(&self) -> Window {
        Window { start: self.start, end: self.end }
    }

    /// Strictly better than `other` by score. NaN scores lose to everything.
    pub fn better(&self, other: &Fragments) -> bool {
        match (self.score.is_nan(), other.score.is_nan()) {
            (true, _) => false,
            (false, true) => true,
            (false, false) => self.score > other.score,
        }
    }
}

/// Searches one window of a query against a structure database.
///
/// Implementors are the database handle. Calls arrive concurrently from every
/// worker with the same profile and sequence.
pub trait FragmentSearch: Sync {
    fn find_fragments(
        &self,
        backend: Backend,
        profile: &Profile,
        sequence: &Sequence,
        window: Window,
    ) -> Result<Fragments>;
}

/// Strict "better-than" used to pick the best window length at a start.
///
/// Must be irreflexive; when neither candidate is better the first one seen
/// is kept.
pub trait MatchComparator: Sync {
    fn better(&self, candidate: &Fragments, best: &Fragments) -> bool;
}

/// Compares candidates by [`Fragments::score`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ByScore;

impl MatchComparator for ByScore {
    fn better(&self, candidate: &Fragments, best: &Fragments) -> bool {
        candidate.better(best)
    }
}

impl<F> MatchComparator for F
where
    F: Fn(&Fragments, &Fragments) -> bool + Sync,
{
    fn better(&self, candidate: &Fragments, best: &Fragments) -> bool {
        self(candidate, best)
    }
}

/// Runs an external program once per window.
///
/// The program is called as
/// `<program> [args...] <profile.hhm> <query.fasta> <start> <end> <backend>`
/// and must print a JSON [`Fragments`] document for that window on stdout.
#[derive(Debug, Clone)]
pub struct CommandSearch {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandSearch {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Extra leading arguments, e.g. the database location
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl FragmentSearch for CommandSearch {
    fn find_fragments(
        &self,
        backend: Backend,
        profile: &Profile,
        sequence: &Sequence,
        window: Window,
    ) -> Result<Fragments> {
        let mut hhm = NamedTempFile::new().context("creating temporary profile")?;
        hhm.write_all(profile.as_str().as_bytes())?;
        let mut fasta = NamedTempFile::new().context("creating temporary query")?;
        fasta.write_all(sequence.to_fasta().as_bytes())?;

        trace!("Running {} for window {}", self.program.display(), window);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(hhm.path())
            .arg(fasta.path())
            .arg(window.start.to_string())
            .arg(window.end.to_string())
            .arg(backend.program())
            .output()
            .with_context(|| format!("could not run {}", self.program.display()))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let frags: Fragments = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("unreadable output from {}", self.program.display()))?;
        if frags.window() != window {
            return Err(anyhow!(
                "{} answered for window {} instead of {}",
                self.program.display(),
                frags.window(),
                window
            ));
        }
        Ok(frags)
    }
}
