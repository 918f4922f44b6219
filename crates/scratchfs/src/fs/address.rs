//! Canonical entry addresses.
//!
//! Every entry slot is identified by an [`Address`]: an absolute,
//! `/`-separated path with no empty, `.` or `..` segments and no trailing
//! separator. Equivalent spellings (`a/b`, `/a/b`, `/a//b/`) normalize to the
//! same address, so the entry table never holds duplicates.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

static FILE_ROOT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("file:///").expect("constant file URL parses"));

/// Normalized absolute path of an entry.
///
/// Addresses order by their path string, so all descendants of a directory
/// form one contiguous run in an ordered map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address {
    path: String,
}

impl Address {
    /// The root directory, `/`.
    pub fn root() -> Self {
        Self {
            path: "/".to_string(),
        }
    }

    /// Normalize a path-like string into an address.
    ///
    /// Bare names are rooted at `/`. Empty and `.` segments are dropped, `..`
    /// pops one segment and stops at root.
    pub fn parse(input: &str) -> Result<Self> {
        if input.contains('\0') {
            return Err(Error::InvalidPath {
                path: input.replace('\0', "\\0"),
                reason: "contains NUL".to_string(),
            });
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in input.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                name => segments.push(name),
            }
        }

        if segments.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self {
            path: format!("/{}", segments.join("/")),
        })
    }

    /// The normalized path string.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Path segments from the root down; empty for root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments; 0 for root.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Last segment, `None` for root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.path.rsplit('/').next()
    }

    /// Containing directory, `None` for root.
    pub fn parent(&self) -> Option<Address> {
        if self.is_root() {
            return None;
        }
        match self.path.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(pos) => Some(Self {
                path: self.path[..pos].to_string(),
            }),
        }
    }

    /// Every proper ancestor, root first.
    pub fn ancestors(&self) -> Vec<Address> {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(dir) = current {
            current = dir.parent();
            chain.push(dir);
        }
        chain.reverse();
        chain
    }

    /// Child address for a single segment name.
    pub fn join(&self, name: &str) -> Result<Address> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(Error::InvalidPath {
                path: format!("{}/{}", self.path.trim_end_matches('/'), name),
                reason: "not a single path segment".to_string(),
            });
        }
        Address::parse(&format!("{}/{}", self.path, name))
    }

    /// True if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Address) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.path.len() > ancestor.path.len()
            && self.path.starts_with(&ancestor.path)
            && self.path.as_bytes()[ancestor.path.len()] == b'/'
    }

    /// True if `self` is exactly one segment below `dir`.
    pub fn is_child_of(&self, dir: &Address) -> bool {
        self.parent().as_ref() == Some(dir)
    }

    /// Replace the `from` prefix with `to`.
    ///
    /// Returns `None` if `self` is neither `from` nor below it.
    pub fn rebase(&self, from: &Address, to: &Address) -> Option<Address> {
        if self == from {
            return Some(to.clone());
        }
        if !self.is_descendant_of(from) {
            return None;
        }
        let suffix = if from.is_root() {
            self.path.as_str()
        } else {
            &self.path[from.path.len()..]
        };
        let path = if to.is_root() {
            suffix.to_string()
        } else {
            format!("{}{}", to.path, suffix)
        };
        Some(Self { path })
    }

    /// Lower bound of the key run holding this address's descendants.
    ///
    /// Not a normalized address; only meant for ordered-map range scans
    /// paired with [`Address::is_descendant_of`].
    pub(crate) fn subtree_floor(&self) -> Address {
        if self.is_root() {
            return self.clone();
        }
        Self {
            path: format!("{}/", self.path),
        }
    }

    /// Fully-qualified `file://` locator for this address.
    pub fn to_url(&self) -> Url {
        let mut url = FILE_ROOT.clone();
        url.set_path(&self.path);
        url
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Address::parse(value)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.path
    }
}
