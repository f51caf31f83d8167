//! Quota tree model
//!
//! One user's configuration: an ordered hierarchy of
//! browser -> version -> region -> host. Child collections keep insertion
//! order so a load/save cycle reproduces the document. Browser names,
//! version numbers and region names are unique among their siblings; host
//! names are not.

use gridquota_common::{Error, NodeKind, Result};

/// Name of the root element of a freshly created document
pub const DEFAULT_ROOT_ELEMENT: &str = "root";

/// Attributes not covered by the quota schema, kept in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraAttributes(Vec<(String, String)>);

impl ExtraAttributes {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an attribute, replacing an existing one with the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, String)> for ExtraAttributes {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// Sibling lookup by key
trait Keyed {
    const KIND: NodeKind;
    fn key(&self) -> &str;
}

fn position<T: Keyed>(items: &[T], key: &str) -> Option<usize> {
    items.iter().position(|item| item.key() == key)
}

fn append_unique<T: Keyed>(items: &mut Vec<T>, item: T) -> Result<&mut T> {
    if position(items, item.key()).is_some() {
        return Err(Error::already_exists(T::KIND, item.key()));
    }
    let idx = items.len();
    items.push(item);
    Ok(&mut items[idx])
}

fn find_or_insert<'a, T: Keyed>(
    items: &'a mut Vec<T>,
    key: &str,
    make: impl FnOnce() -> T,
) -> (&'a mut T, bool) {
    match position(items, key) {
        Some(idx) => (&mut items[idx], false),
        None => {
            let idx = items.len();
            items.push(make());
            (&mut items[idx], true)
        }
    }
}

fn remove_keyed<T: Keyed>(items: &mut Vec<T>, key: &str) -> Option<T> {
    position(items, key).map(|idx| items.remove(idx))
}

/// Root element of a document, kept verbatim for round-trips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootElement {
    /// Qualified element name (e.g. `root` or `qa:browsers`)
    pub name: String,
    /// All attributes of the root, including namespace declarations
    pub attributes: ExtraAttributes,
}

impl Default for RootElement {
    fn default() -> Self {
        Self {
            name: DEFAULT_ROOT_ELEMENT.to_string(),
            attributes: ExtraAttributes::new(),
        }
    }
}

/// One user's quota configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaDocument {
    root: RootElement,
    browsers: Vec<Browser>,
}

impl QuotaDocument {
    /// Create an empty document with the default root element
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document with a specific root element
    #[must_use]
    pub const fn with_root(root: RootElement) -> Self {
        Self {
            root,
            browsers: Vec::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> &RootElement {
        &self.root
    }

    #[must_use]
    pub fn browsers(&self) -> &[Browser] {
        &self.browsers
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.browsers.is_empty()
    }

    /// Total number of host entries across the whole tree
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.browsers
            .iter()
            .flat_map(|b| &b.versions)
            .flat_map(|v| &v.regions)
            .map(|r| r.hosts.len())
            .sum()
    }

    #[must_use]
    pub fn find_browser(&self, name: &str) -> Option<&Browser> {
        self.browsers.iter().find(|b| b.name == name)
    }

    pub fn find_browser_mut(&mut self, name: &str) -> Option<&mut Browser> {
        self.browsers.iter_mut().find(|b| b.name == name)
    }

    /// Resolve a browser/version/region path without creating anything
    #[must_use]
    pub fn find_region(&self, browser: &str, version: &str, region: &str) -> Option<&Region> {
        self.find_browser(browser)?
            .find_version(version)?
            .find_region(region)
    }

    pub fn find_region_mut(
        &mut self,
        browser: &str,
        version: &str,
        region: &str,
    ) -> Option<&mut Region> {
        self.find_browser_mut(browser)?
            .find_version_mut(version)?
            .find_region_mut(region)
    }

    /// Append a browser; fails if one with the same name exists
    pub fn append_browser(&mut self, browser: Browser) -> Result<&mut Browser> {
        append_unique(&mut self.browsers, browser)
    }

    /// Return the named browser, appending a new one if absent.
    ///
    /// The flag is `true` when the browser was created.
    pub fn find_or_insert_browser(&mut self, name: &str) -> (&mut Browser, bool) {
        find_or_insert(&mut self.browsers, name, || Browser::new(name))
    }

    pub fn remove_browser(&mut self, name: &str) -> Option<Browser> {
        remove_keyed(&mut self.browsers, name)
    }

    pub(crate) fn last_browser_mut(&mut self) -> Option<&mut Browser> {
        self.browsers.last_mut()
    }
}

/// A browser and the versions configured for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Browser {
    name: String,
    /// Version picked when a client does not ask for one
    pub default_version: Option<String>,
    versions: Vec<Version>,
    pub extra_attributes: ExtraAttributes,
}

impl Keyed for Browser {
    const KIND: NodeKind = NodeKind::Browser;

    fn key(&self) -> &str {
        &self.name
    }
}

impl Browser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_version: None,
            versions: Vec::new(),
            extra_attributes: ExtraAttributes::new(),
        }
    }

    #[must_use]
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    #[must_use]
    pub fn find_version(&self, number: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.number == number)
    }

    pub fn find_version_mut(&mut self, number: &str) -> Option<&mut Version> {
        self.versions.iter_mut().find(|v| v.number == number)
    }

    /// Append a version; fails if one with the same number exists
    pub fn append_version(&mut self, version: Version) -> Result<&mut Version> {
        append_unique(&mut self.versions, version)
    }

    pub fn find_or_insert_version(&mut self, number: &str) -> (&mut Version, bool) {
        find_or_insert(&mut self.versions, number, || Version::new(number))
    }

    pub fn remove_version(&mut self, number: &str) -> Option<Version> {
        remove_keyed(&mut self.versions, number)
    }

    pub(crate) fn last_version_mut(&mut self) -> Option<&mut Version> {
        self.versions.last_mut()
    }
}

/// A browser version and the regions serving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    number: String,
    regions: Vec<Region>,
    pub extra_attributes: ExtraAttributes,
}

impl Keyed for Version {
    const KIND: NodeKind = NodeKind::Version;

    fn key(&self) -> &str {
        &self.number
    }
}

impl Version {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            regions: Vec::new(),
            extra_attributes: ExtraAttributes::new(),
        }
    }

    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[must_use]
    pub fn find_region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn find_region_mut(&mut self, name: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.name == name)
    }

    /// Append a region; fails if one with the same name exists
    pub fn append_region(&mut self, region: Region) -> Result<&mut Region> {
        append_unique(&mut self.regions, region)
    }

    pub fn find_or_insert_region(&mut self, name: &str) -> (&mut Region, bool) {
        find_or_insert(&mut self.regions, name, || Region::new(name))
    }

    pub fn remove_region(&mut self, name: &str) -> Option<Region> {
        remove_keyed(&mut self.regions, name)
    }

    pub(crate) fn last_region_mut(&mut self) -> Option<&mut Region> {
        self.regions.last_mut()
    }
}

/// A region and the hosts it routes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    name: String,
    hosts: Vec<Host>,
    pub extra_attributes: ExtraAttributes,
}

impl Keyed for Region {
    const KIND: NodeKind = NodeKind::Region;

    fn key(&self) -> &str {
        &self.name
    }
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: Vec::new(),
            extra_attributes: ExtraAttributes::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// All hosts with the given name, in document order
    pub fn find_hosts_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Host> + 'a {
        self.hosts.iter().filter(move |h| h.name == name)
    }

    /// Append a host. Host names are not deduplicated.
    pub fn append_host(&mut self, host: Host) -> &mut Host {
        let idx = self.hosts.len();
        self.hosts.push(host);
        &mut self.hosts[idx]
    }

    /// Remove the first host (in document order) with the given name
    pub fn remove_host(&mut self, name: &str) -> Option<Host> {
        self.hosts
            .iter()
            .position(|h| h.name == name)
            .map(|idx| self.hosts.remove(idx))
    }
}

/// A backend host with its capacity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    pub port: String,
    /// Number of sessions the host accepts
    pub count: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub scheme: Option<String>,
    pub vnc: Option<String>,
    pub extra_attributes: ExtraAttributes,
}

impl Host {
    pub fn new(
        name: impl Into<String>,
        port: impl Into<String>,
        count: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            port: port.into(),
            count: count.into(),
            username: None,
            password: None,
            scheme: None,
            vnc: None,
            extra_attributes: ExtraAttributes::new(),
        }
    }

    /// Set the username; empty values leave it unset
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = non_empty(username.into());
        self
    }

    /// Set the password; empty values leave it unset
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = non_empty(password.into());
        self
    }

    /// Set the scheme; empty values leave it unset
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = non_empty(scheme.into());
        self
    }

    /// Set the VNC address; empty values leave it unset
    #[must_use]
    pub fn with_vnc(mut self, vnc: impl Into<String>) -> Self {
        self.vnc = non_empty(vnc.into());
        self
    }

    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> QuotaDocument {
        let mut doc = QuotaDocument::new();
        let browser = doc.append_browser(Browser::new("chrome")).unwrap();
        let version = browser.append_version(Version::new("90")).unwrap();
        let region = version.append_region(Region::new("eu")).unwrap();
        region.append_host(Host::new("h1", "4444", "5"));
        doc
    }

    #[test]
    fn test_find_path() {
        let doc = sample_document();
        assert!(doc.find_browser("chrome").is_some());
        assert!(doc.find_browser("firefox").is_none());
        let region = doc.find_region("chrome", "90", "eu").unwrap();
        assert_eq!(region.hosts().len(), 1);
        assert!(doc.find_region("chrome", "91", "eu").is_none());
    }

    #[test]
    fn test_append_rejects_duplicate_keys() {
        let mut doc = sample_document();
        let err = doc.append_browser(Browser::new("chrome")).unwrap_err();
        assert!(matches!(
            err,
            Error::AlreadyExists {
                kind: NodeKind::Browser,
                ..
            }
        ));

        let browser = doc.find_browser_mut("chrome").unwrap();
        assert!(browser.append_version(Version::new("90")).is_err());
        let version = browser.find_version_mut("90").unwrap();
        assert!(version.append_region(Region::new("eu")).is_err());
        assert!(version.append_region(Region::new("us")).is_ok());
    }

    #[test]
    fn test_find_or_insert_returns_existing() {
        let mut doc = sample_document();
        let (_, created) = doc.find_or_insert_browser("chrome");
        assert!(!created);
        let (browser, created) = doc.find_or_insert_browser("firefox");
        assert!(created);
        assert_eq!(browser.name(), "firefox");
        assert_eq!(doc.browsers().len(), 2);
    }

    #[test]
    fn test_hosts_are_not_deduplicated() {
        let mut doc = sample_document();
        let region = doc.find_region_mut("chrome", "90", "eu").unwrap();
        region.append_host(Host::new("h1", "4445", "3"));
        assert_eq!(region.find_hosts_by_name("h1").count(), 2);
        assert_eq!(doc.host_count(), 2);
    }

    #[test]
    fn test_remove_host_takes_first_match() {
        let mut region = Region::new("eu");
        region.append_host(Host::new("h1", "1", "1"));
        region.append_host(Host::new("h2", "2", "2"));
        region.append_host(Host::new("h1", "3", "3"));

        let removed = region.remove_host("h1").unwrap();
        assert_eq!(removed.port, "1");
        let remaining: Vec<_> = region.hosts().iter().map(|h| h.port.as_str()).collect();
        assert_eq!(remaining, vec!["2", "3"]);
        assert!(region.remove_host("h9").is_none());
    }

    #[test]
    fn test_remove_keyed_nodes() {
        let mut doc = sample_document();
        let browser = doc.find_browser_mut("chrome").unwrap();
        let version = browser.find_version_mut("90").unwrap();
        assert!(version.remove_region("eu").is_some());
        assert!(version.regions().is_empty());
        assert!(browser.remove_version("90").is_some());
        assert!(browser.remove_version("90").is_none());
        assert!(doc.remove_browser("chrome").is_some());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_empty_credentials_are_unset() {
        let host = Host::new("h1", "4444", "5")
            .with_username("")
            .with_password("secret")
            .with_scheme("")
            .with_vnc("vnc://h1:5900");
        assert!(host.username.is_none());
        assert_eq!(host.password.as_deref(), Some("secret"));
        assert!(host.scheme.is_none());
        assert!(host.has_credentials());
    }

    #[test]
    fn test_extra_attributes_keep_order() {
        let mut attrs = ExtraAttributes::new();
        attrs.insert("zone", "a");
        attrs.insert("alias", "b");
        attrs.insert("zone", "c");
        let pairs: Vec<_> = attrs.iter().collect();
        assert_eq!(pairs, vec![("zone", "c"), ("alias", "b")]);
        assert_eq!(attrs.get("alias"), Some("b"));
    }
}
