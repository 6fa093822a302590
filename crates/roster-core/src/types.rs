use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Euclidean distance below which two descriptors belong to the same person.
pub const MATCH_THRESHOLD: f32 = 0.6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("descriptor length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("descriptor is empty")]
    Empty,
}

/// Facial descriptor as produced by the recognition model (128-dimensional
/// for the usual face-api style models; the length is not fixed here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean distance to `other`.
    ///
    /// Both descriptors must be non-empty and of equal length; anything else
    /// would silently compare unrelated dimensions.
    pub fn distance(&self, other: &Descriptor) -> Result<f32, DescriptorError> {
        if self.0.len() != other.0.len() {
            return Err(DescriptorError::LengthMismatch {
                left: self.0.len(),
                right: other.0.len(),
            });
        }
        if self.0.is_empty() {
            return Err(DescriptorError::Empty);
        }

        Ok(self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt())
    }

    /// True iff the distance to `other` is strictly below [`MATCH_THRESHOLD`].
    pub fn is_match(&self, other: &Descriptor) -> Result<bool, DescriptorError> {
        Ok(self.distance(other)? < MATCH_THRESHOLD)
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// A registered player, keyed by national ID.
///
/// Field names on the wire are `id`, `year` and `facialDescriptor`; the
/// browser-era names `dni` and `descriptorFacial` are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    #[serde(alias = "dni")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "descriptorFacial"
    )]
    pub facial_descriptor: Option<Descriptor>,
}

impl PlayerRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            year: None,
            facial_descriptor: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.facial_descriptor = Some(descriptor);
        self
    }
}

/// Result of matching a probe descriptor against the registered players.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// Distance to the closest comparable player (`None` if there was none).
    pub distance: Option<f32>,
    /// ID of the closest player, set only when `matched`.
    pub player_id: Option<String>,
}

/// Strategy for comparing a probe descriptor against a gallery of players.
pub trait Matcher {
    fn compare(&self, probe: &Descriptor, gallery: &[PlayerRecord], threshold: f32) -> MatchResult;
}

/// Nearest-neighbour matcher over Euclidean distance.
///
/// Players without a descriptor, or with one of a different length than the
/// probe, are skipped.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Descriptor, gallery: &[PlayerRecord], threshold: f32) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (i, player) in gallery.iter().enumerate() {
            let Some(descriptor) = &player.facial_descriptor else {
                continue;
            };
            let distance = match probe.distance(descriptor) {
                Ok(d) => d,
                Err(e) => {
                    tracing::debug!(id = %player.id, error = %e, "skipping incomparable descriptor");
                    continue;
                }
            };
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }

        match best {
            Some((idx, distance)) if distance < threshold => MatchResult {
                matched: true,
                distance: Some(distance),
                player_id: Some(gallery[idx].id.clone()),
            },
            _ => MatchResult {
                matched: false,
                distance: best.map(|(_, d)| d),
                player_id: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[test]
    fn test_self_distance_is_match() {
        let a = d(&[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(a.distance(&a).unwrap(), 0.0);
        assert!(a.is_match(&a).unwrap());
    }

    #[test]
    fn test_distance_known_value() {
        let a = d(&[0.0, 0.0]);
        let b = d(&[3.0, 4.0]);
        assert!((a.distance(&b).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_strict() {
        let origin = d(&[0.0]);
        assert!(!origin.is_match(&d(&[0.6])).unwrap());
        assert!(!origin.is_match(&d(&[0.75])).unwrap());
        assert!(origin.is_match(&d(&[0.59])).unwrap());
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = d(&[0.1, 0.2]).is_match(&d(&[0.1])).unwrap_err();
        assert_eq!(err, DescriptorError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_empty_descriptor_is_error() {
        assert_eq!(d(&[]).distance(&d(&[])).unwrap_err(), DescriptorError::Empty);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = PlayerRecord::new("12345678")
            .with_year(2024)
            .with_descriptor(d(&[0.5, 0.25]));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "12345678", "year": 2024, "facialDescriptor": [0.5, 0.25]})
        );
    }

    #[test]
    fn test_record_omits_absent_fields() {
        let json = serde_json::to_value(PlayerRecord::new("1")).unwrap();
        assert_eq!(json, serde_json::json!({"id": "1"}));
    }

    #[test]
    fn test_record_accepts_legacy_names() {
        let record: PlayerRecord =
            serde_json::from_str(r#"{"dni":"42","year":2023,"descriptorFacial":[1.0,2.0]}"#)
                .unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.year, Some(2023));
        assert_eq!(record.facial_descriptor, Some(d(&[1.0, 2.0])));
    }

    #[test]
    fn test_record_accepts_null_year() {
        let record: PlayerRecord = serde_json::from_str(r#"{"id":"7","year":null}"#).unwrap();
        assert_eq!(record.year, None);
    }

    fn player(id: &str, values: Option<&[f32]>) -> PlayerRecord {
        PlayerRecord {
            id: id.into(),
            year: None,
            facial_descriptor: values.map(d),
        }
    }

    #[test]
    fn test_matcher_picks_closest() {
        let probe = d(&[0.0, 0.0]);
        let gallery = vec![
            player("far", Some(&[0.5, 0.0])),
            player("none", None),
            player("near", Some(&[0.1, 0.0])),
        ];

        let result = EuclideanMatcher.compare(&probe, &gallery, MATCH_THRESHOLD);
        assert!(result.matched);
        assert_eq!(result.player_id.as_deref(), Some("near"));
        assert!((result.distance.unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_no_match_reports_distance() {
        let probe = d(&[0.0, 0.0]);
        let gallery = vec![player("other", Some(&[1.0, 0.0]))];

        let result = EuclideanMatcher.compare(&probe, &gallery, MATCH_THRESHOLD);
        assert!(!result.matched);
        assert!(result.player_id.is_none());
        assert!((result.distance.unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_skips_mismatched_lengths() {
        let probe = d(&[0.0, 0.0]);
        let gallery = vec![player("short", Some(&[0.0])), player("ok", Some(&[0.2, 0.0]))];

        let result = EuclideanMatcher.compare(&probe, &gallery, MATCH_THRESHOLD);
        assert_eq!(result.player_id.as_deref(), Some("ok"));
    }

    #[test]
    fn test_matcher_empty_gallery() {
        let result = EuclideanMatcher.compare(&d(&[1.0]), &[], MATCH_THRESHOLD);
        assert!(!result.matched);
        assert!(result.distance.is_none());
    }
}
