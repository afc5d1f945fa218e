//! Statistics over collected tracks: linear fits, residuals, age cohorts and
//! per-group diagnostics.
//!
//! Everything here is a pure function of the enriched records. Undefined
//! inputs (missing values, NaN) are skipped, never treated as zero.

mod cohort;
mod diagnostics;
mod ranking;
mod regression;

pub use cohort::{cohort_matrix, CohortBucket, CohortCell};
pub use diagnostics::{
    group_diagnostics, release_counts, summarize_groups, GroupDiagnostic, GroupSummary,
    ReleaseCount, ReleasePeriod,
};
pub use ranking::{apply_min_popularity, sort_records, SortKey};
pub use regression::{fit_linear, residuals, LinearFit, ResidualAnalysis, ResidualRow};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::catalog::EnrichedTrackRecord;

/// Numeric column of an enriched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AgeYears,
    Popularity,
    StayingIndex,
    DurationMin,
    ReleaseYear,
    CollaboratorCount,
}

impl Metric {
    pub fn value_of(&self, record: &EnrichedTrackRecord) -> Option<f64> {
        let value = match self {
            Metric::AgeYears => record.age_years,
            Metric::Popularity => record.popularity(),
            Metric::StayingIndex => record.staying_index,
            Metric::DurationMin => record.duration_min,
            Metric::ReleaseYear => record.release_year.map(f64::from),
            Metric::CollaboratorCount => Some(record.collaborator_count as f64),
        };
        value.filter(|v| v.is_finite())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::AgeYears => "age_years",
            Metric::Popularity => "popularity",
            Metric::StayingIndex => "staying_index",
            Metric::DurationMin => "duration_min",
            Metric::ReleaseYear => "release_year",
            Metric::CollaboratorCount => "collaborator_count",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mean of the defined values, `None` when there are none.
pub(crate) fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;

    #[test]
    fn test_value_of_reads_columns() {
        let r = record("t1", "IU", Some("2021-01-01"), Some(80));
        assert_eq!(Metric::Popularity.value_of(&r), Some(80.0));
        assert_eq!(Metric::AgeYears.value_of(&r), Some(3.0));
        assert_eq!(Metric::StayingIndex.value_of(&r), Some(20.0));
        assert_eq!(Metric::ReleaseYear.value_of(&r), Some(2021.0));
        assert_eq!(Metric::CollaboratorCount.value_of(&r), Some(1.0));
    }

    #[test]
    fn test_value_of_undefined() {
        let r = record("t1", "IU", None, None);
        assert_eq!(Metric::Popularity.value_of(&r), None);
        assert_eq!(Metric::AgeYears.value_of(&r), None);
        assert_eq!(Metric::StayingIndex.value_of(&r), None);
    }

    #[test]
    fn test_mean_skips_undefined() {
        assert_eq!(mean([Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean([None, Some(f64::NAN)]), None);
        assert_eq!(mean(Vec::<Option<f64>>::new()), None);
    }
}
