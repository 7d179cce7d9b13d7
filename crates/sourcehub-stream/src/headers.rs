//! Request-header forwarding onto emitted events.

use sourcehub_core::contracts::Headers;

/// Headers copied from the inbound request onto every event it causes.
/// Everything else (authorization material, transport noise) is dropped.
pub const FORWARDABLE_HEADERS: &[&str] = &[
    "x-rh-identity",
    "x-rh-sources-psk",
    "x-rh-sources-account-number",
    "x-rh-sources-org-id",
    "x-rh-insights-request-id",
];

/// Filters an inbound header map down to the forwardable set. Matching
/// is case-insensitive; keys are normalized to lowercase, values pass
/// through verbatim.
pub fn forwardable_headers(inbound: &Headers) -> Headers {
    inbound
        .iter()
        .filter_map(|(key, value)| {
            let normalized = key.to_ascii_lowercase();
            FORWARDABLE_HEADERS
                .contains(&normalized.as_str())
                .then(|| (normalized, value.clone()))
        })
        .collect()
}
