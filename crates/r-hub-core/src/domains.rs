//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Subdomain normalisation, length budget and registry-backed selection."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use r_hub_client::{HubError, OrgContext, ResourceClient, Result};
use tracing::debug;
use url::Url;

/// Maximum length of a DNS label.
pub const MAX_LABEL_LEN: usize = 63;

/// Lowercase the candidate and turn spaces into hyphens.
pub fn normalize_subdomain(raw: &str) -> String {
    raw.trim().replace(' ', "-").to_lowercase()
}

/// Reject names that cannot fit in one DNS label once the org key is appended.
///
/// Online hostnames are `{subdomain}-{url_key}`; enterprise subdomains stand alone.
pub fn check_length(subdomain: &str, url_key: Option<&str>) -> Result<()> {
    if subdomain.is_empty() {
        return Err(HubError::Precondition("subdomain must not be empty".to_owned()));
    }
    match url_key {
        Some(key) if subdomain.len() + 1 + key.len() > MAX_LABEL_LEN => {
            Err(HubError::Precondition(format!(
                "requested url too long; enter a name shorter than {} characters",
                MAX_LABEL_LEN.saturating_sub(key.len())
            )))
        }
        None if subdomain.len() > MAX_LABEL_LEN => Err(HubError::Precondition(format!(
            "requested url too long; enter a name shorter than {MAX_LABEL_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

/// Next candidate after a collision: `foo` -> `foo1`, `foo9` -> `foo10`.
pub fn next_candidate(subdomain: &str) -> String {
    let stem = subdomain.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &subdomain[stem.len()..];
    match digits.parse::<u64>() {
        Ok(n) => format!("{stem}{}", n + 1),
        Err(_) => format!("{subdomain}1"),
    }
}

/// Hosted hostname of an online site.
pub fn hosted_hostname(subdomain: &str, url_key: &str, hub_host: &str) -> String {
    format!("{subdomain}-{url_key}.{hub_host}")
}

/// Site URL on an enterprise portal.
pub fn enterprise_site_url(portal: &Url, subdomain: &str) -> String {
    format!("{}apps/sites/#/{}", portal.as_str(), subdomain)
}

/// Strip scheme and path from a hostname or URL.
pub fn hostname_of(input: &str) -> String {
    let without_scheme = input
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(input);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_owned()
}

/// Pick a free hostname for an online site.
///
/// The length budget is checked before any registry call. When the first
/// candidate is taken the trailing counter is bumped and the registry is
/// asked once more; a second collision fails with `DomainUnavailable`.
pub fn select_subdomain(
    client: &ResourceClient,
    org: &OrgContext,
    candidate: &str,
) -> Result<String> {
    let hub_host = client.roots().hub().host_str().unwrap_or_default().to_owned();
    check_length(candidate, Some(&org.url_key))?;

    let hostname = hosted_hostname(candidate, &org.url_key, &hub_host);
    if client.lookup_domain(&hostname)?.is_none() {
        return Ok(candidate.to_owned());
    }

    let bumped = next_candidate(candidate);
    check_length(&bumped, Some(&org.url_key))?;
    let hostname = hosted_hostname(&bumped, &org.url_key, &hub_host);
    debug!(candidate, bumped = %bumped, "subdomain taken, retrying with counter");
    match client.lookup_domain(&hostname)? {
        None => Ok(bumped),
        Some(_) => Err(HubError::DomainUnavailable(hostname)),
    }
}
