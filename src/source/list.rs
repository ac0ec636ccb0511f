//! Plain range lists: local text files and fixed in-memory lists.

use std::fs;
use std::path::{Path, PathBuf};

use super::RangeSource;
use crate::Result;

/// Parse a text list with one range per line.
///
/// `#` starts a comment; blank lines are skipped.
pub fn parse_range_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ranges read from a local text file on every refresh.
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("file:{}", path.display()),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RangeSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_ranges(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(parse_range_list(&content))
    }
}

/// A fixed list of ranges.
pub struct StaticSource {
    name: String,
    ranges: Vec<String>,
}

impl StaticSource {
    pub fn new<I, S>(name: &str, ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            ranges: ranges.into_iter().map(Into::into).collect(),
        }
    }
}

impl RangeSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_ranges(&self) -> Result<Vec<String>> {
        Ok(self.ranges.clone())
    }
}
