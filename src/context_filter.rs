use anyhow::{Result, anyhow};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Selects contexts by name with glob patterns (`QGMDialog*`, `!MeshQt`).
/// A name passes when it matches an include pattern (or none are given) and
/// no exclude pattern.
#[derive(Debug, Clone)]
pub struct ContextFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl ContextFilter {
    pub fn new(patterns: &[String]) -> Result<Option<Self>> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        let mut include_count = 0;
        let mut exclude_count = 0;

        for raw in patterns {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let (negated, pattern) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            if pattern.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(false)
                .backslash_escape(true)
                .build()
                .map_err(|err| anyhow!("invalid context pattern '{}': {}", raw, err))?;
            if negated {
                exclude.add(glob);
                exclude_count += 1;
            } else {
                include.add(glob);
                include_count += 1;
            }
        }

        if include_count == 0 && exclude_count == 0 {
            return Ok(None);
        }
        let build = |builder: GlobSetBuilder, count: usize| -> Result<Option<GlobSet>> {
            if count == 0 {
                return Ok(None);
            }
            builder
                .build()
                .map(Some)
                .map_err(|err| anyhow!("failed to compile context patterns: {}", err))
        };
        Ok(Some(Self {
            include: build(include, include_count)?,
            exclude: build(exclude, exclude_count)?,
        }))
    }

    pub fn matches(&self, name: &str) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(name) {
                return false;
            }
        }
        match &self.include {
            Some(include) => include.is_match(name),
            None => true,
        }
    }
}

/// `None` lets every context through.
pub fn allows(filter: Option<&ContextFilter>, name: &str) -> bool {
    filter.map(|filter| filter.matches(name)).unwrap_or(true)
}
