//! Bi-temporal edge validity.
//!
//! Every relationship carries a `[validity_from, validity_to)` window.
//! A structural change never deletes an edge: the old edge is closed by
//! setting `validity_to` and a new edge is opened. An absent `validity_to`
//! is the open sentinel, meaning the edge is still valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The validity window carried by an edge.
///
/// Invariant: `validity_to`, if present, is strictly greater than
/// `validity_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeValidity {
    pub validity_from: DateTime<Utc>,
    /// None = open sentinel (still valid).
    pub validity_to: Option<DateTime<Utc>>,
}

impl EdgeValidity {
    pub fn open(from: DateTime<Utc>) -> Self {
        Self {
            validity_from: from,
            validity_to: None,
        }
    }

    pub fn closed(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            validity_from: from,
            validity_to: Some(to),
        }
    }

    pub fn is_open(&self) -> bool {
        self.validity_to.is_none()
    }
}

/// Temporal filter applied to edges during traversal.
///
/// `as_of` and `current_only` are mutually exclusive; supplying both is a
/// caller error rejected by the parameter validator. An absent filter means
/// no temporal filtering at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidityFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl ValidityFilter {
    pub fn current_only() -> Self {
        Self {
            current_only: Some(true),
            as_of: None,
        }
    }

    pub fn as_of(instant: DateTime<Utc>) -> Self {
        Self {
            current_only: None,
            as_of: Some(instant),
        }
    }

    /// True when both selectors were supplied; the validator rejects this
    /// rather than silently picking one.
    pub fn is_ambiguous(&self) -> bool {
        self.current_only == Some(true) && self.as_of.is_some()
    }

    /// True when the filter imposes no temporal constraint.
    pub fn is_noop(&self) -> bool {
        self.as_of.is_none() && self.current_only != Some(true)
    }
}

/// Whether an edge is live under the given filter.
///
/// - No filter → always true.
/// - `current_only` → true iff the edge's `validity_to` is open.
/// - `as_of = t` → true iff `validity_from <= t < validity_to`, where an
///   open `validity_to` admits any `t >= validity_from`. The end instant is
///   exclusive: an edge closed at `t` is no longer live at `t`.
pub fn is_live(edge: &EdgeValidity, filter: Option<&ValidityFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if let Some(t) = filter.as_of {
        return edge.validity_from <= t && edge.validity_to.map_or(true, |to| to > t);
    }
    if filter.current_only == Some(true) {
        return edge.is_open();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_no_filter_always_live() {
        let closed = EdgeValidity::closed(at("2023-01-01T00:00:00Z"), at("2023-06-01T00:00:00Z"));
        assert!(is_live(&closed, None));
    }

    #[test]
    fn test_current_only() {
        let open = EdgeValidity::open(at("2023-01-01T00:00:00Z"));
        let closed = EdgeValidity::closed(at("2023-01-01T00:00:00Z"), at("2023-06-01T00:00:00Z"));
        let filter = ValidityFilter::current_only();
        assert!(is_live(&open, Some(&filter)));
        assert!(!is_live(&closed, Some(&filter)));
    }

    #[test]
    fn test_as_of_within_window() {
        let edge = EdgeValidity::closed(at("2023-01-01T00:00:00Z"), at("2023-06-01T00:00:00Z"));
        let t = ValidityFilter::as_of(at("2023-03-01T00:00:00Z"));
        assert!(is_live(&edge, Some(&t)));
    }

    #[test]
    fn test_as_of_end_is_exclusive() {
        let edge = EdgeValidity::closed(at("2023-01-01T00:00:00Z"), at("2023-06-01T00:00:00Z"));
        // Exactly at validity_to: no longer live.
        let at_end = ValidityFilter::as_of(at("2023-06-01T00:00:00Z"));
        assert!(!is_live(&edge, Some(&at_end)));
        // Exactly at validity_from: live (start is inclusive).
        let at_start = ValidityFilter::as_of(at("2023-01-01T00:00:00Z"));
        assert!(is_live(&edge, Some(&at_start)));
    }

    #[test]
    fn test_as_of_before_window() {
        let edge = EdgeValidity::closed(at("2023-01-01T00:00:00Z"), at("2023-06-01T00:00:00Z"));
        let before = ValidityFilter::as_of(at("2022-12-31T23:59:59Z"));
        assert!(!is_live(&edge, Some(&before)));
    }

    #[test]
    fn test_as_of_open_sentinel() {
        let edge = EdgeValidity::open(at("2023-01-01T00:00:00Z"));
        let far_future = ValidityFilter::as_of(Utc.with_ymd_and_hms(2040, 1, 1, 0, 0, 0).unwrap());
        assert!(is_live(&edge, Some(&far_future)));
    }

    #[test]
    fn test_ambiguous_filter_detected() {
        let both = ValidityFilter {
            current_only: Some(true),
            as_of: Some(at("2023-01-01T00:00:00Z")),
        };
        assert!(both.is_ambiguous());
        assert!(!ValidityFilter::current_only().is_ambiguous());
        assert!(!ValidityFilter::default().is_ambiguous());
    }

    #[test]
    fn test_noop_filter() {
        assert!(ValidityFilter::default().is_noop());
        assert!(!ValidityFilter::current_only().is_noop());
        let explicit_false = ValidityFilter {
            current_only: Some(false),
            as_of: None,
        };
        assert!(is_live(
            &EdgeValidity::closed(at("2023-01-01T00:00:00Z"), at("2023-06-01T00:00:00Z")),
            Some(&explicit_false)
        ));
    }
}
