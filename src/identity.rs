//! Rotating outbound request identities for upstream extraction calls.
//!
//! The upstream rate-limits and challenges clients it fingerprints as
//! automated, so every extraction attempt presents itself as a fresh
//! browser: a user agent drawn from a fixed pool, a browser-shaped header
//! set, and a plausible forwarded client address. Identities are ephemeral;
//! nothing is shared between calls, so the rotator is safe to use from any
//! number of in-flight requests without locking.

use rand::Rng;

/// Referer presented with every extraction attempt.
const UPSTREAM_REFERER: &str = "https://www.youtube.com/";

/// Fixed pool of realistic user agents: Windows/macOS/Linux desktop plus
/// iPhone and Android mobile, current-ish browser builds.
const USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
];

/// First octets for synthesized forwarded addresses. All are from large
/// public allocations, so the generated address never lands in a reserved
/// or private range regardless of the remaining octets.
const PUBLIC_FIRST_OCTETS: [u8; 8] = [23, 34, 52, 66, 81, 104, 143, 203];

/// A single ephemeral outbound identity. Created fresh per extraction
/// attempt, used once, then discarded.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    /// Browser user agent string presented to the upstream.
    pub user_agent: String,
    /// Additional request headers (name, value) to apply alongside the UA.
    pub headers: Vec<(String, String)>,
    /// Synthesized client address for forwarding headers.
    pub spoofed_origin: String,
}

impl RequestIdentity {
    /// Referer to present with this identity.
    #[must_use]
    pub fn referer(&self) -> &'static str {
        UPSTREAM_REFERER
    }
}

/// Produces a fresh [`RequestIdentity`] on demand.
///
/// Holds no mutable state; the pool is a compile-time constant, so `next`
/// may be called concurrently from any number of requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRotator;

impl IdentityRotator {
    /// Creates a rotator over the built-in user-agent pool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns a fresh identity: uniformly chosen user agent, a synthetic
    /// public client address, and a browser-shaped header set.
    #[must_use]
    pub fn next(&self) -> RequestIdentity {
        let mut rng = rand::thread_rng();
        let user_agent = USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())].to_string();
        let spoofed_origin = format!(
            "{}.{}.{}.{}",
            PUBLIC_FIRST_OCTETS[rng.gen_range(0..PUBLIC_FIRST_OCTETS.len())],
            rng.gen_range(1..=254u8),
            rng.gen_range(1..=254u8),
            rng.gen_range(1..=254u8),
        );

        let headers = vec![
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
            ("Sec-Fetch-Mode".to_string(), "navigate".to_string()),
            ("X-Forwarded-For".to_string(), spoofed_origin.clone()),
        ];

        RequestIdentity {
            user_agent,
            headers,
            spoofed_origin,
        }
    }
}
