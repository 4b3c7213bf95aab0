//! One design's append-only version history

use kiln_script::Script;
use ulid::Ulid;

use crate::version::{Version, VersionId};

/// Unique lineage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct LineageId(pub Ulid);

impl LineageId {
    /// Generate new lineage ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for LineageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LineageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The append-only history of one design across refinements
///
/// Invariants: version numbers are 1-based, contiguous and never reused;
/// exactly one version is latest at any time; versions are demoted, never
/// deleted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Lineage {
    id: LineageId,
    versions: Vec<Version>,
}

impl Lineage {
    /// Start a lineage with version 1 marked latest
    #[must_use]
    pub(crate) fn start(first_script: Script) -> Self {
        Self {
            id: LineageId::new(),
            versions: vec![Version::new(1, None, first_script)],
        }
    }

    /// Lineage identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> LineageId {
        self.id
    }

    /// All versions in append order
    #[inline]
    #[must_use]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// The current latest version
    ///
    /// A lineage always holds at least version 1.
    #[must_use]
    pub fn latest(&self) -> &Version {
        self.versions
            .last()
            .unwrap_or_else(|| unreachable!("a lineage always has version 1"))
    }

    /// Highest version number
    #[inline]
    #[must_use]
    pub fn latest_version_number(&self) -> u32 {
        self.latest().number
    }

    /// Look up a version by its id
    #[must_use]
    pub fn version(&self, id: VersionId) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub(crate) fn version_mut(&mut self, id: VersionId) -> Option<&mut Version> {
        self.versions.iter_mut().find(|v| v.id == id)
    }

    /// Append version N+1, demoting the previous latest
    pub(crate) fn append(&mut self, script: Script, parent: VersionId) -> VersionId {
        let number = self.latest_version_number() + 1;
        for version in &mut self.versions {
            version.is_latest = false;
        }
        let version = Version::new(number, Some(parent), script);
        let id = version.id;
        self.versions.push(version);
        id
    }
}
