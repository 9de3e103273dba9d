// src/judge/cache.rs
//! On-disk verdict cache keyed by SHA-256 of (model, prompt).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::judge::prompt::JudgeVerdict;

#[derive(Debug, Clone)]
pub struct VerdictCache {
    dir: PathBuf,
}

pub fn cache_key(model: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

impl VerdictCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        // lookups miss and each put reports its own error
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(
                target: "pri",
                error = %e,
                dir = %dir.display(),
                "judge cache directory unavailable"
            );
        }
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn get(&self, model: &str, prompt: &str) -> Option<JudgeVerdict> {
        let s = fs::read_to_string(self.path(&cache_key(model, prompt))).ok()?;
        serde_json::from_str(&s).ok()
    }

    /// Write via a temp file and rename so readers never see a partial entry.
    pub fn put(&self, model: &str, prompt: &str, verdict: &JudgeVerdict) -> io::Result<()> {
        let path = self.path(&cache_key(model, prompt));
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(verdict)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(tmp, path)
    }
}
