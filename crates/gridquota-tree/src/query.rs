//! Read-only listing of a quota tree
//!
//! Builds a display projection of a document. In [`ListMode::Sorted`]
//! regions and hosts are ordered by name (byte order, case-sensitive) while
//! browsers and versions keep document order. [`ListMode::Raw`] keeps
//! document order at every level. Passwords are never projected.

use crate::model::{Browser, Host, QuotaDocument, Region, Version};
use gridquota_common::ListMode;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaView {
    pub browsers: Vec<BrowserView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,
    pub versions: Vec<VersionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionView {
    pub number: String,
    pub regions: Vec<RegionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionView {
    pub name: String,
    pub hosts: Vec<HostView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostView {
    pub name: String,
    pub port: String,
    pub count: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vnc: Option<String>,
}

/// Project `doc` for display using the given ordering policy
#[must_use]
pub fn list_sections(doc: &QuotaDocument, mode: ListMode) -> QuotaView {
    QuotaView {
        browsers: doc
            .browsers()
            .iter()
            .map(|b| browser_view(b, mode))
            .collect(),
    }
}

fn browser_view(browser: &Browser, mode: ListMode) -> BrowserView {
    BrowserView {
        name: browser.name().to_string(),
        default_version: browser.default_version.clone(),
        versions: browser
            .versions()
            .iter()
            .map(|v| version_view(v, mode))
            .collect(),
    }
}

fn version_view(version: &Version, mode: ListMode) -> VersionView {
    let mut regions: Vec<RegionView> = version
        .regions()
        .iter()
        .map(|r| region_view(r, mode))
        .collect();
    if mode == ListMode::Sorted {
        regions.sort_by(|a, b| a.name.cmp(&b.name));
    }
    VersionView {
        number: version.number().to_string(),
        regions,
    }
}

fn region_view(region: &Region, mode: ListMode) -> RegionView {
    let mut hosts: Vec<HostView> = region.hosts().iter().map(host_view).collect();
    if mode == ListMode::Sorted {
        // Stable: hosts sharing a name keep document order
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
    }
    RegionView {
        name: region.name().to_string(),
        hosts,
    }
}

fn host_view(host: &Host) -> HostView {
    HostView {
        name: host.name.clone(),
        port: host.port.clone(),
        count: host.count.clone(),
        username: host.username.clone(),
        scheme: host.scheme.clone(),
        vnc: host.vnc.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{SectionPath, add_host, add_section};

    fn names<'a, T>(items: &'a [T], name: impl Fn(&'a T) -> &'a str) -> Vec<&'a str> {
        items.iter().map(name).collect()
    }

    fn sample() -> QuotaDocument {
        let mut doc = QuotaDocument::new();
        let eu = SectionPath::new("chrome", "90", "eu");
        for host in ["zeta", "alpha", "mike"] {
            add_host(&mut doc, &eu, Host::new(host, "4444", "1"));
        }
        add_section(&mut doc, &SectionPath::new("chrome", "90", "asia"), None);
        add_section(&mut doc, &SectionPath::new("chrome", "88", "us"), None);
        add_section(&mut doc, &SectionPath::new("ANDROID", "10", "eu"), None);
        doc
    }

    #[test]
    fn test_sorted_mode_orders_regions_and_hosts() {
        let view = list_sections(&sample(), ListMode::Sorted);
        assert_eq!(names(&view.browsers, |b| b.name.as_str()), vec!["chrome", "ANDROID"]);

        let chrome = &view.browsers[0];
        assert_eq!(names(&chrome.versions, |v| v.number.as_str()), vec!["90", "88"]);
        let v90 = &chrome.versions[0];
        assert_eq!(names(&v90.regions, |r| r.name.as_str()), vec!["asia", "eu"]);
        assert_eq!(
            names(&v90.regions[1].hosts, |h| h.name.as_str()),
            vec!["alpha", "mike", "zeta"]
        );
    }

    #[test]
    fn test_raw_mode_keeps_document_order() {
        let view = list_sections(&sample(), ListMode::Raw);
        let v90 = &view.browsers[0].versions[0];
        assert_eq!(names(&v90.regions, |r| r.name.as_str()), vec!["eu", "asia"]);
        assert_eq!(
            names(&v90.regions[0].hosts, |h| h.name.as_str()),
            vec!["zeta", "alpha", "mike"]
        );
    }

    #[test]
    fn test_sorting_is_case_sensitive() {
        let mut doc = QuotaDocument::new();
        let p = SectionPath::new("chrome", "90", "eu");
        for host in ["beta", "Alpha", "alpha"] {
            add_host(&mut doc, &p, Host::new(host, "1", "1"));
        }
        let view = list_sections(&doc, ListMode::Sorted);
        let hosts = &view.browsers[0].versions[0].regions[0].hosts;
        assert_eq!(names(hosts, |h| h.name.as_str()), vec!["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn test_password_not_projected() {
        let mut doc = QuotaDocument::new();
        add_host(
            &mut doc,
            &SectionPath::new("chrome", "90", "eu"),
            Host::new("h1", "4444", "5")
                .with_username("selenium")
                .with_password("secret"),
        );
        let view = list_sections(&doc, ListMode::Raw);
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("selenium"));
        assert!(!json.contains("secret"));
        assert!(!json.contains("default_version"));
    }

    #[test]
    fn test_list_does_not_mutate() {
        let doc = sample();
        let before = doc.clone();
        let _ = list_sections(&doc, ListMode::Sorted);
        assert_eq!(doc, before);
    }
}
