// src/ledger.rs
//! Dedup ledger: fingerprints of notices already delivered, one hex digest per
//! line in an append-only text file.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::ingest::types::RawNotice;

/// Which notice fields make up its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintBasis {
    /// Content only: a re-stamped notice with the same text is not re-sent.
    #[default]
    Content,
    /// Content plus the displayed timestamp when there is one.
    ContentAndTimestamp,
}

impl FromStr for FingerprintBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(Self::Content),
            "content+timestamp" | "content_timestamp" | "content-and-timestamp" => {
                Ok(Self::ContentAndTimestamp)
            }
            other => Err(format!(
                "unknown fingerprint basis `{other}` (expected content|content+timestamp)"
            )),
        }
    }
}

/// SHA-256 of the canonical fields, as 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub const HEX_LEN: usize = 64;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a stored ledger line (trimmed, lowercased). Lines of unexpected
    /// shape are kept as-is; they simply never match a fresh digest.
    pub fn from_line(line: &str) -> Option<Self> {
        let t = line.trim();
        (!t.is_empty()).then(|| Self(t.to_ascii_lowercase()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const FIELD_SEP: u8 = 0x1f;

pub fn fingerprint(notice: &RawNotice, basis: FingerprintBasis) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(notice.content.as_bytes());
    if basis == FingerprintBasis::ContentAndTimestamp {
        if let Some(ts) = notice.occurred_at.as_deref() {
            hasher.update([FIELD_SEP]);
            hasher.update(ts.trim().as_bytes());
        }
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(Fingerprint::HEX_LEN);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Fingerprint(out)
}

/// In-memory set mirrored by the ledger file. Never shrinks.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    seen: HashSet<Fingerprint>,
    // file exists and its last line lacks a terminator
    needs_newline: bool,
}

impl Ledger {
    /// Bulk-load the whole file. A missing file is an empty ledger.
    pub async fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (seen, needs_newline) = match fs::read_to_string(&path).await {
            Ok(s) => (
                s.lines().filter_map(Fingerprint::from_line).collect(),
                !s.is_empty() && !s.ends_with('\n'),
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (HashSet::new(), false),
            Err(e) => return Err(e),
        };
        tracing::debug!(path = %path.display(), entries = seen.len(), "ledger loaded");
        Ok(Self {
            path,
            seen,
            needs_newline,
        })
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.seen.contains(fp)
    }

    /// Add one line and flush it to disk before returning.
    /// Already-present fingerprints are not written twice.
    pub async fn append(&mut self, fp: Fingerprint) -> io::Result<()> {
        if self.seen.contains(&fp) {
            return Ok(());
        }

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut line = String::with_capacity(fp.as_str().len() + 2);
        if self.needs_newline {
            line.push('\n');
        }
        line.push_str(fp.as_str());
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        self.needs_newline = false;
        self.seen.insert(fp);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
