use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sgp4::Elements;
use utoipa::ToSchema;

use super::error::ElementError;
use super::tle::parse_last_tle;

/// Raw provider response: element text plus when the provider produced it.
#[derive(Debug, Clone)]
pub struct RawElements {
    pub text: String,
    pub retrieved_at: DateTime<Utc>,
}

/// A parsed element set. Immutable once built; the cache replaces whole
/// entries rather than mutating them.
#[derive(Debug, Clone, Serialize)]
pub struct OrbitalElementSet {
    pub catalog_id: u32,
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub epoch: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip)]
    pub elements: Elements,
}

impl OrbitalElementSet {
    /// Parse provider text for `catalog_id`. The set must describe the
    /// requested object.
    pub fn parse(
        catalog_id: u32,
        text: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, ElementError> {
        let malformed = |message: String| ElementError::Malformed {
            catalog_id,
            message,
        };

        let tle = parse_last_tle(text)
            .ok_or_else(|| malformed("expected two element lines".to_string()))?;

        let elements = Elements::from_tle(
            tle.name.clone(),
            tle.line1.as_bytes(),
            tle.line2.as_bytes(),
        )
        .map_err(|e| malformed(e.to_string()))?;

        if elements.norad_id != u64::from(catalog_id) {
            return Err(malformed(format!(
                "element set describes {}",
                elements.norad_id
            )));
        }

        Ok(Self {
            catalog_id,
            name: tle.name.unwrap_or_else(|| format!("NORAD {}", catalog_id)),
            line1: tle.line1,
            line2: tle.line2,
            epoch: elements.datetime.and_utc(),
            fetched_at,
            elements,
        })
    }
}

/// How a cache lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Freshness {
    /// Fetched from the provider by this call.
    Fetched,
    /// Served from cache within its TTL.
    Cached,
    /// Provider failed; an expired entry was served instead.
    Stale { age_seconds: i64 },
}

impl Freshness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Freshness::Stale { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CachedElements {
    pub elements: Arc<OrbitalElementSet>,
    pub freshness: Freshness,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE1: &str = "1 25544U 98067A   25278.49802050  .00011384  00000+0  20935-3 0  9990";
    const LINE2: &str = "2 25544  51.6327 120.3420 0000884 206.2421 153.8523 15.49697304532279";

    #[test]
    fn parses_and_defaults_name() {
        let now = Utc::now();
        let set = OrbitalElementSet::parse(25544, &format!("{LINE1}\n{LINE2}"), now).unwrap();
        assert_eq!(set.name, "NORAD 25544");
        assert_eq!(set.fetched_at, now);
        assert_eq!(set.epoch.format("%Y-%m-%d").to_string(), "2025-10-05");
    }

    #[test]
    fn rejects_wrong_object() {
        let err = OrbitalElementSet::parse(20580, &format!("{LINE1}\n{LINE2}"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ElementError::Malformed { catalog_id: 20580, .. }));
    }

    #[test]
    fn rejects_garbage() {
        let err = OrbitalElementSet::parse(25544, "Invalid TLE data", Utc::now()).unwrap_err();
        assert!(matches!(err, ElementError::Malformed { .. }));
    }
}
