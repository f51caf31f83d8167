//! Mutation engine
//!
//! Find-or-create for browser/version/region sections, append for hosts,
//! and the cascading removals. Every operation reports a
//! [`MutationOutcome`] so callers can skip persisting when nothing changed.

use crate::model::{Host, QuotaDocument, Region};
use gridquota_common::{Error, NodeKind, Result};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// A browser/version/region path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SectionPath {
    pub browser: String,
    pub version: String,
    pub region: String,
}

impl SectionPath {
    pub fn new(
        browser: impl Into<String>,
        version: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            browser: browser.into(),
            version: version.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.browser, self.version, self.region)
    }
}

/// Which levels of a section path were created by a find-or-create
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Created {
    pub browser: bool,
    pub version: bool,
    pub region: bool,
}

impl Created {
    #[must_use]
    pub const fn any(self) -> bool {
        self.browser || self.version || self.region
    }
}

/// Effect of applying a mutation to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The section path exists; `created` says which levels are new
    SectionEnsured { created: Created },
    /// A host was appended, possibly after creating its section
    HostAdded { created: Created },
    /// The named region existed and was removed
    RegionRemoved,
    /// The named region did not exist, so its version was removed instead
    VersionRemoved { browser_removed: bool },
    /// The first host with the requested name was removed
    HostRemoved,
    /// The host or its section did not exist
    NothingRemoved,
}

impl MutationOutcome {
    /// Whether the document differs from before the mutation
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        match self {
            Self::SectionEnsured { created } => created.any(),
            Self::HostAdded { .. }
            | Self::RegionRemoved
            | Self::VersionRemoved { .. }
            | Self::HostRemoved => true,
            Self::NothingRemoved => false,
        }
    }
}

/// A mutation requested by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Ensure the section exists, optionally appending a host to it
    AddSection {
        path: SectionPath,
        host: Option<Host>,
    },
    /// Ensure the section exists and append a host to it
    AddHost { path: SectionPath, host: Host },
    /// Remove the region, or the version when the region does not exist
    RemoveSection { path: SectionPath },
    /// Remove the first host with the given name
    RemoveHost { path: SectionPath, host: String },
}

impl Mutation {
    /// Short operation name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddSection { .. } => "add_section",
            Self::AddHost { .. } => "add_host",
            Self::RemoveSection { .. } => "remove_section",
            Self::RemoveHost { .. } => "remove_host",
        }
    }

    #[must_use]
    pub const fn path(&self) -> &SectionPath {
        match self {
            Self::AddSection { path, .. }
            | Self::AddHost { path, .. }
            | Self::RemoveSection { path }
            | Self::RemoveHost { path, .. } => path,
        }
    }

    /// Apply the mutation to a document
    pub fn apply(&self, doc: &mut QuotaDocument) -> Result<MutationOutcome> {
        match self {
            Self::AddSection { path, host } => Ok(add_section(doc, path, host.clone())),
            Self::AddHost { path, host } => Ok(add_host(doc, path, host.clone())),
            Self::RemoveSection { path } => remove_section(doc, path),
            Self::RemoveHost { path, host } => Ok(remove_host(doc, path, host)),
        }
    }
}

/// Find or create every level of `path`.
///
/// A browser created here gets `defaultVersion` set to the path's version
/// when `set_default_version` is true.
fn ensure_section<'a>(
    doc: &'a mut QuotaDocument,
    path: &SectionPath,
    set_default_version: bool,
) -> (&'a mut Region, Created) {
    let (browser, browser_created) = doc.find_or_insert_browser(&path.browser);
    if browser_created && set_default_version {
        browser.default_version = Some(path.version.clone());
    }
    let (version, version_created) = browser.find_or_insert_version(&path.version);
    let (region, region_created) = version.find_or_insert_region(&path.region);
    let created = Created {
        browser: browser_created,
        version: version_created,
        region: region_created,
    };
    if created.any() {
        debug!(section = %path, ?created, "created section");
    }
    (region, created)
}

/// Ensure a section exists, then append `host` to it when given.
///
/// A browser created by this call has its default version set to the
/// requested version.
pub fn add_section(
    doc: &mut QuotaDocument,
    path: &SectionPath,
    host: Option<Host>,
) -> MutationOutcome {
    let (region, created) = ensure_section(doc, path, true);
    match host {
        Some(host) => {
            debug!(section = %path, host = %host.name, "appending host");
            region.append_host(host);
            MutationOutcome::HostAdded { created }
        }
        None => MutationOutcome::SectionEnsured { created },
    }
}

/// Ensure a section exists and append `host` to it.
///
/// Hosts are never deduplicated: adding the same name twice yields two
/// entries.
pub fn add_host(doc: &mut QuotaDocument, path: &SectionPath, host: Host) -> MutationOutcome {
    let (region, created) = ensure_section(doc, path, false);
    debug!(section = %path, host = %host.name, "appending host");
    region.append_host(host);
    MutationOutcome::HostAdded { created }
}

/// Remove a section.
///
/// The browser and version must exist. If the region exists only the
/// region is removed, even when that leaves the version empty. If the
/// region does not exist the whole version is removed instead, and the
/// browser with it when that was its last version.
pub fn remove_section(doc: &mut QuotaDocument, path: &SectionPath) -> Result<MutationOutcome> {
    let browser = doc
        .find_browser_mut(&path.browser)
        .ok_or_else(|| Error::not_found(NodeKind::Browser, &path.browser))?;
    let version = browser
        .find_version_mut(&path.version)
        .ok_or_else(|| Error::not_found(NodeKind::Version, &path.version))?;

    if version.remove_region(&path.region).is_some() {
        debug!(section = %path, "removed region");
        return Ok(MutationOutcome::RegionRemoved);
    }

    browser.remove_version(&path.version);
    let browser_removed = browser.versions().is_empty();
    if browser_removed {
        doc.remove_browser(&path.browser);
    }
    debug!(section = %path, browser_removed, "region absent, removed version");
    Ok(MutationOutcome::VersionRemoved { browser_removed })
}

/// Remove the first host named `host` from the region at `path`.
///
/// A missing section or host is not an error.
pub fn remove_host(doc: &mut QuotaDocument, path: &SectionPath, host: &str) -> MutationOutcome {
    let Some(region) = doc.find_region_mut(&path.browser, &path.version, &path.region) else {
        debug!(section = %path, host, "section not found, nothing to remove");
        return MutationOutcome::NothingRemoved;
    };
    if region.remove_host(host).is_some() {
        debug!(section = %path, host, "removed host");
        MutationOutcome::HostRemoved
    } else {
        MutationOutcome::NothingRemoved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn path(browser: &str, version: &str, region: &str) -> SectionPath {
        SectionPath::new(browser, version, region)
    }

    fn host_names(doc: &QuotaDocument, p: &SectionPath) -> Vec<String> {
        doc.find_region(&p.browser, &p.version, &p.region)
            .map(|r| r.hosts().iter().map(|h| h.name.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_add_section_is_find_or_create() {
        let mut doc = QuotaDocument::new();
        let p = path("chrome", "90", "eu");

        let first = add_section(&mut doc, &p, None);
        assert_eq!(
            first,
            MutationOutcome::SectionEnsured {
                created: Created {
                    browser: true,
                    version: true,
                    region: true
                }
            }
        );
        assert!(first.is_changed());

        let second = add_section(&mut doc, &p, None);
        assert!(!second.is_changed());

        assert_eq!(doc.browsers().len(), 1);
        let browser = doc.find_browser("chrome").unwrap();
        assert_eq!(browser.versions().len(), 1);
        assert_eq!(browser.versions()[0].regions().len(), 1);
    }

    #[test]
    fn test_add_section_sets_default_version_on_new_browser_only() {
        let mut doc = QuotaDocument::new();
        add_section(&mut doc, &path("chrome", "90", "eu"), None);
        add_section(&mut doc, &path("chrome", "91", "eu"), None);
        let browser = doc.find_browser("chrome").unwrap();
        assert_eq!(browser.default_version.as_deref(), Some("90"));
        assert_eq!(browser.versions().len(), 2);
    }

    #[test]
    fn test_add_host_does_not_set_default_version() {
        let mut doc = QuotaDocument::new();
        add_host(&mut doc, &path("chrome", "90", "eu"), Host::new("h1", "4444", "5"));
        assert!(doc.find_browser("chrome").unwrap().default_version.is_none());
    }

    #[test]
    fn test_add_section_with_host() {
        let mut doc = QuotaDocument::new();
        let p = path("chrome", "90", "eu");
        let outcome = add_section(&mut doc, &p, Some(Host::new("h1", "4444", "5")));
        assert!(matches!(outcome, MutationOutcome::HostAdded { .. }));
        assert_eq!(host_names(&doc, &p), vec!["h1"]);
        assert_eq!(
            doc.find_browser("chrome").unwrap().default_version.as_deref(),
            Some("90")
        );
    }

    #[test]
    fn test_add_host_appends_duplicates() {
        let mut doc = QuotaDocument::new();
        let p = path("chrome", "90", "eu");
        add_host(&mut doc, &p, Host::new("h1", "4444", "5"));
        let outcome = add_host(&mut doc, &p, Host::new("h1", "4445", "5"));
        assert_eq!(outcome, MutationOutcome::HostAdded { created: Created::default() });

        let region = doc.find_region("chrome", "90", "eu").unwrap();
        let ports: Vec<_> = region.find_hosts_by_name("h1").map(|h| h.port.as_str()).collect();
        assert_eq!(ports, vec!["4444", "4445"]);
    }

    #[test]
    fn test_remove_section_cascade() {
        let mut doc = QuotaDocument::new();
        add_section(&mut doc, &path("chrome", "90", "eu"), None);

        let outcome = remove_section(&mut doc, &path("chrome", "90", "eu")).unwrap();
        assert_eq!(outcome, MutationOutcome::RegionRemoved);
        let version = doc.find_browser("chrome").unwrap().find_version("90").unwrap();
        assert!(version.regions().is_empty());

        let outcome = remove_section(&mut doc, &path("chrome", "90", "nowhere")).unwrap();
        assert_eq!(outcome, MutationOutcome::VersionRemoved { browser_removed: true });
        assert!(doc.is_empty());
    }

    #[test]
    fn test_remove_section_keeps_browser_with_other_versions() {
        let mut doc = QuotaDocument::new();
        add_section(&mut doc, &path("chrome", "90", "eu"), None);
        add_section(&mut doc, &path("chrome", "91", "eu"), None);

        let outcome = remove_section(&mut doc, &path("chrome", "90", "us")).unwrap();
        assert_eq!(outcome, MutationOutcome::VersionRemoved { browser_removed: false });
        let browser = doc.find_browser("chrome").unwrap();
        assert!(browser.find_version("90").is_none());
        assert!(browser.find_version("91").is_some());
    }

    #[test]
    fn test_remove_section_reports_missing_keys() {
        let mut doc = QuotaDocument::new();
        add_section(&mut doc, &path("chrome", "90", "eu"), None);

        let err = remove_section(&mut doc, &path("firefox", "1", "x")).unwrap_err();
        match err {
            Error::NotFound { kind, key } => {
                assert_eq!(kind, NodeKind::Browser);
                assert_eq!(key, "firefox");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = remove_section(&mut doc, &path("chrome", "1", "x")).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                kind: NodeKind::Version,
                ..
            }
        ));
    }

    #[test]
    fn test_remove_host_tolerates_missing_path() {
        let mut doc = QuotaDocument::new();
        add_host(&mut doc, &path("chrome", "90", "eu"), Host::new("h1", "4444", "5"));
        let before = doc.clone();

        let outcome = remove_host(&mut doc, &path("chrome", "90", "us"), "h1");
        assert_eq!(outcome, MutationOutcome::NothingRemoved);
        assert!(!outcome.is_changed());

        let outcome = remove_host(&mut doc, &path("chrome", "90", "eu"), "h9");
        assert_eq!(outcome, MutationOutcome::NothingRemoved);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_remove_host_removes_first_match_only() {
        let mut doc = QuotaDocument::new();
        let p = path("chrome", "90", "eu");
        add_host(&mut doc, &p, Host::new("h1", "1", "1"));
        add_host(&mut doc, &p, Host::new("h1", "2", "1"));

        assert_eq!(remove_host(&mut doc, &p, "h1"), MutationOutcome::HostRemoved);
        let region = doc.find_region("chrome", "90", "eu").unwrap();
        assert_eq!(region.hosts().len(), 1);
        assert_eq!(region.hosts()[0].port, "2");
    }

    #[test]
    fn test_remove_last_host_keeps_region() {
        let mut doc = QuotaDocument::new();
        let p = path("chrome", "90", "eu");
        add_host(&mut doc, &p, Host::new("h1", "1", "1"));
        remove_host(&mut doc, &p, "h1");
        assert!(doc.find_region("chrome", "90", "eu").unwrap().hosts().is_empty());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut doc = QuotaDocument::new();
        let eu = path("chrome", "90", "eu");

        Mutation::AddHost {
            path: eu.clone(),
            host: Host::new("h1", "4444", "5"),
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(host_names(&doc, &eu), vec!["h1"]);

        Mutation::AddHost {
            path: eu.clone(),
            host: Host::new("h2", "4445", "3"),
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(host_names(&doc, &eu), vec!["h1", "h2"]);

        Mutation::RemoveHost {
            path: eu.clone(),
            host: "h1".to_string(),
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(host_names(&doc, &eu), vec!["h2"]);

        let outcome = Mutation::RemoveSection {
            path: path("chrome", "90", "us"),
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(outcome, MutationOutcome::VersionRemoved { browser_removed: true });
        assert!(doc.is_empty());
    }

    #[test]
    fn test_mutated_tree_round_trips() {
        let mut doc = QuotaDocument::new();
        add_section(&mut doc, &path("chrome", "90", "eu"), None);
        add_host(
            &mut doc,
            &path("chrome", "90", "us"),
            Host::new("h1", "4444", "5").with_username("u").with_password("p"),
        );
        add_host(&mut doc, &path("firefox", "88", "eu"), Host::new("h2", "4444", "1"));

        let text = codec::serialize(&doc).unwrap();
        let reloaded = codec::parse(&text).unwrap();
        assert_eq!(reloaded, doc);
        assert_eq!(codec::serialize(&reloaded).unwrap(), text);
    }

    #[test]
    fn test_mutation_metadata() {
        let m = Mutation::RemoveHost {
            path: path("chrome", "90", "eu"),
            host: "h1".into(),
        };
        assert_eq!(m.name(), "remove_host");
        assert_eq!(m.path().to_string(), "chrome/90/eu");
    }
}
