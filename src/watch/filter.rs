// src/watch/filter.rs

//! Decide which new files are slides worth dispatching.

use std::path::Path;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled set of file-name globs (case-insensitive).
///
/// Patterns are matched against the final path component only, since the
/// watch is not recursive.
#[derive(Debug, Clone)]
pub struct SlideFilter {
    set: GlobSet,
    patterns: Vec<String>,
}

impl SlideFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = GlobBuilder::new(pat)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid slide pattern: {pat}"))?;
            builder.add(glob);
        }
        let set = builder.build().context("building slide pattern set")?;
        Ok(Self {
            set,
            patterns: patterns.to_vec(),
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, path: &Path) -> bool {
        match path.file_name() {
            Some(name) => self.set.is_match(Path::new(name)),
            None => false,
        }
    }
}
