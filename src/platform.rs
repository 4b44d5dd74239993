//! Platform-aware tuning of fetch parameters.
//!
//! Constrained clients (mobile, narrow viewports, metered connections) get smaller fetch
//! ceilings, longer timeouts, lower concurrency, longer pauses between batches, fewer retries
//! and progressive loading.

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Viewports narrower than this many CSS pixels are treated as constrained.
pub const NARROW_VIEWPORT_WIDTH: u32 = 768;

/// User agent fragments of constrained devices, matched case-insensitively.
const CONSTRAINED_UA_MARKERS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
    "mobile",
];

/// Coarse platform class of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlatformClass {
    /// Mobile or otherwise constrained client.
    Constrained,
    /// Desktop-class client.
    Unconstrained,
}

impl PlatformClass {
    /// Short label used for metrics and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Constrained => "constrained",
            Self::Unconstrained => "unconstrained",
        }
    }
}

impl fmt::Display for PlatformClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller knows about the client platform.
///
/// Detection (reading the user agent, measuring the viewport) happens at the caller; this is
/// only the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformHint {
    /// Explicit request for the constrained profile.
    pub constrained: bool,
    /// The client's user agent string.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// The client's viewport width in CSS pixels.
    #[serde(default)]
    pub viewport_width: Option<u32>,
}

impl PlatformHint {
    /// A hint explicitly requesting the constrained profile.
    pub fn constrained() -> Self {
        Self { constrained: true, ..Default::default() }
    }

    /// A hint for a desktop-class client.
    pub fn unconstrained() -> Self {
        Self::default()
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the viewport width.
    pub fn with_viewport_width(mut self, width: u32) -> Self {
        self.viewport_width = Some(width);
        self
    }

    /// Resolves the hint to a platform class.
    ///
    /// The explicit flag is upgraded to constrained when the user agent or viewport says so.
    pub fn class(&self) -> PlatformClass {
        let ua_constrained = self.user_agent.as_deref().is_some_and(|ua| {
            let ua = ua.to_lowercase();
            CONSTRAINED_UA_MARKERS.iter().any(|marker| ua.contains(marker))
        });
        let narrow = self.viewport_width.is_some_and(|width| width < NARROW_VIEWPORT_WIDTH);

        if self.constrained || ua_constrained || narrow {
            PlatformClass::Constrained
        } else {
            PlatformClass::Unconstrained
        }
    }
}

/// Tuning parameters for one fetch session.
///
/// Selected once per session and never changed while fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformProfile {
    /// The class this profile was selected for.
    pub class: PlatformClass,
    /// Maximum number of raffles fetched per session.
    pub max_items: usize,
    /// Timeout of a single remote read attempt.
    pub timeout: Duration,
    /// Number of raffles fetched per chunk.
    pub concurrency: usize,
    /// Pause between chunks.
    pub batch_delay: Duration,
    /// Maximum number of attempts per remote read.
    pub retry_count: u32,
    /// Base delay of the linear retry backoff.
    pub retry_delay: Duration,
    /// Read raffles one at a time, call by call, reporting progress after each.
    pub progressive_loading: bool,
}

impl PlatformProfile {
    /// Profile for desktop-class clients.
    pub const UNCONSTRAINED: Self = Self {
        class: PlatformClass::Unconstrained,
        max_items: 100,
        timeout: Duration::from_secs(10),
        concurrency: 5,
        batch_delay: Duration::from_millis(100),
        retry_count: 3,
        retry_delay: Duration::from_secs(1),
        progressive_loading: false,
    };

    /// Profile for mobile and otherwise constrained clients.
    pub const CONSTRAINED: Self = Self {
        class: PlatformClass::Constrained,
        max_items: 20,
        timeout: Duration::from_secs(15),
        concurrency: 2,
        batch_delay: Duration::from_millis(500),
        retry_count: 2,
        retry_delay: Duration::from_secs(2),
        progressive_loading: true,
    };

    /// Selects the profile for a client.
    pub fn select(hint: &PlatformHint) -> Self {
        Self::for_class(hint.class())
    }

    /// The profile of a platform class.
    pub const fn for_class(class: PlatformClass) -> Self {
        match class {
            PlatformClass::Constrained => Self::CONSTRAINED,
            PlatformClass::Unconstrained => Self::UNCONSTRAINED,
        }
    }

    /// Whether this is the constrained profile.
    pub fn is_constrained(&self) -> bool {
        self.class == PlatformClass::Constrained
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry count and base delay.
    pub fn with_retries(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the chunk size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the pause between chunks.
    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self::UNCONSTRAINED
    }
}
