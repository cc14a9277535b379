//! Image reference parsing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// An image reference split into repository and tag
///
/// A digest (`app@sha256:...`) is kept in the tag slot, which is where the
/// engine's pull call accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    /// Repository, including registry host and port when present
    pub repository: String,
    /// Tag or digest
    pub tag: String,
}

impl ImageReference {
    /// Tag used when the reference names none
    pub const DEFAULT_TAG: &'static str = "latest";

    /// Split `name[:tag]` or `name@digest`
    ///
    /// A colon only separates a tag when it comes after the last `/`, so
    /// `registry:5000/app` keeps its port and gets the default tag.
    ///
    /// # Errors
    /// Returns error if the repository or tag part is empty
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();

        let (repository, tag) = if let Some((repo, digest)) = reference.split_once('@') {
            (repo, digest)
        } else {
            let name_start = reference.rfind('/').map_or(0, |i| i + 1);
            match reference[name_start..].rfind(':') {
                Some(i) => {
                    let split = name_start + i;
                    (&reference[..split], &reference[split + 1..])
                }
                None => (reference, Self::DEFAULT_TAG),
            }
        };

        if repository.is_empty() {
            return Err(Error::InvalidConfig {
                message: format!("Image reference '{reference}' has no repository"),
            });
        }

        if tag.is_empty() {
            return Err(Error::InvalidConfig {
                message: format!("Image reference '{reference}' has an empty tag"),
            });
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Whether the tag slot holds a content digest
    #[must_use]
    pub fn is_digest(&self) -> bool {
        self.tag.contains(':')
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_digest() {
            write!(f, "{}@{}", self.repository, self.tag)
        } else {
            write!(f, "{}:{}", self.repository, self.tag)
        }
    }
}

impl FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
