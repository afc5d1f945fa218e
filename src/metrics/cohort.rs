use serde::Serialize;

use super::mean;
use crate::catalog::{round2, EnrichedTrackRecord};

/// Half-open track-age bins, in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CohortBucket {
    #[serde(rename = "0-1y")]
    UnderOne,
    #[serde(rename = "1-3y")]
    OneToThree,
    #[serde(rename = "3-6y")]
    ThreeToSix,
    #[serde(rename = "6-9y")]
    SixToNine,
    #[serde(rename = "9y+")]
    NineOrMore,
}

impl CohortBucket {
    pub const ALL: [CohortBucket; 5] = [
        CohortBucket::UnderOne,
        CohortBucket::OneToThree,
        CohortBucket::ThreeToSix,
        CohortBucket::SixToNine,
        CohortBucket::NineOrMore,
    ];

    /// `None` for an undefined or NaN age. Negative ages, releases dated
    /// after the reference date, fall in the youngest bucket.
    pub fn from_age(age_years: Option<f64>) -> Option<Self> {
        let age = age_years.filter(|a| !a.is_nan())?;
        Some(if age < 1.0 {
            CohortBucket::UnderOne
        } else if age < 3.0 {
            CohortBucket::OneToThree
        } else if age < 6.0 {
            CohortBucket::ThreeToSix
        } else if age < 9.0 {
            CohortBucket::SixToNine
        } else {
            CohortBucket::NineOrMore
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CohortBucket::UnderOne => "0-1y",
            CohortBucket::OneToThree => "1-3y",
            CohortBucket::ThreeToSix => "3-6y",
            CohortBucket::SixToNine => "6-9y",
            CohortBucket::NineOrMore => "9y+",
        }
    }
}

impl std::fmt::Display for CohortBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean popularity of one group's tracks in one age bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortCell {
    pub group: String,
    pub bucket: CohortBucket,
    pub tracks: usize,
    pub mean_popularity: Option<f64>,
}

/// Group × age-bucket matrix, groups in first-seen order and buckets in age
/// order. Only non-empty cells are returned; records without an age are left
/// out.
pub fn cohort_matrix(records: &[EnrichedTrackRecord]) -> Vec<CohortCell> {
    let mut groups: Vec<&str> = Vec::new();
    let mut cells: Vec<(usize, CohortBucket, Vec<Option<f64>>)> = Vec::new();

    for record in records {
        let Some(bucket) = CohortBucket::from_age(record.age_years) else {
            continue;
        };
        let group = match groups.iter().position(|g| *g == record.main_artist) {
            Some(index) => index,
            None => {
                groups.push(&record.main_artist);
                groups.len() - 1
            }
        };
        match cells.iter_mut().find(|(g, b, _)| *g == group && *b == bucket) {
            Some((_, _, values)) => values.push(record.popularity()),
            None => cells.push((group, bucket, vec![record.popularity()])),
        }
    }

    cells.sort_by_key(|(group, bucket, _)| (*group, *bucket));
    cells
        .into_iter()
        .map(|(group, bucket, values)| CohortCell {
            group: groups[group].to_string(),
            bucket,
            tracks: values.len(),
            mean_popularity: mean(values).map(round2),
        })
        .collect()
}
