//! Plain-text rendering for CLI output

use gridquota_common::{ListMode, UserId};
use gridquota_store::Applied;
use gridquota_tree::{HostView, Mutation, MutationOutcome, QuotaView};

/// Render a listing as an indented tree
pub fn render_view(user: &UserId, mode: ListMode, view: &QuotaView) -> String {
    let mut lines = vec![format!("Quota for {user} ({mode})")];
    if view.browsers.is_empty() {
        lines.push("  (no browsers)".to_string());
    }
    for browser in &view.browsers {
        match &browser.default_version {
            Some(default) => lines.push(format!("  {} (default {default})", browser.name)),
            None => lines.push(format!("  {}", browser.name)),
        }
        for version in &browser.versions {
            lines.push(format!("    {}", version.number));
            for region in &version.regions {
                lines.push(format!("      {} [{} hosts]", region.name, region.hosts.len()));
                lines.extend(region.hosts.iter().map(render_host));
            }
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_host(host: &HostView) -> String {
    let scheme = host.scheme.as_deref().unwrap_or("http");
    let mut line = format!(
        "        {scheme}://{}:{} x{}",
        host.name, host.port, host.count
    );
    if let Some(username) = &host.username {
        line.push_str(&format!(" user={username}"));
    }
    if let Some(vnc) = &host.vnc {
        line.push_str(&format!(" vnc={vnc}"));
    }
    line
}

/// Describe the effect of an applied mutation
pub fn render_outcome(mutation: &Mutation, applied: &Applied) -> String {
    let path = mutation.path();
    let effect = match applied.outcome {
        MutationOutcome::SectionEnsured { created } if created.any() => {
            format!("created section {path}")
        }
        MutationOutcome::SectionEnsured { .. } => format!("section {path} already exists"),
        MutationOutcome::HostAdded { .. } => match mutation {
            Mutation::AddSection {
                host: Some(host), ..
            }
            | Mutation::AddHost { host, .. } => format!("added host {} to {path}", host.name),
            _ => format!("added host to {path}"),
        },
        MutationOutcome::RegionRemoved => format!("removed region {}", path.region),
        MutationOutcome::VersionRemoved {
            browser_removed: true,
        } => format!(
            "removed version {} and browser {}",
            path.version, path.browser
        ),
        MutationOutcome::VersionRemoved { .. } => format!("removed version {}", path.version),
        MutationOutcome::HostRemoved => match mutation {
            Mutation::RemoveHost { host, .. } => format!("removed host {host} from {path}"),
            _ => format!("removed host from {path}"),
        },
        MutationOutcome::NothingRemoved => format!("nothing to remove at {path}"),
    };
    if applied.outcome.is_changed() {
        format!("{effect} (revision {})", applied.revision)
    } else {
        effect
    }
}
