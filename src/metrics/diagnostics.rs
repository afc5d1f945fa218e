use std::cmp::Ordering;

use clap::ValueEnum;
use serde::Serialize;

use super::regression::{fit_linear, LinearFit};
use super::{mean, Metric};
use crate::catalog::{round2, EnrichedTrackRecord};

/// Per-group linear fit of `y` against `x`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDiagnostic {
    pub group: String,
    /// Records in the group with both values defined
    pub n: usize,
    pub fit: Option<LinearFit>,
}

impl GroupDiagnostic {
    pub fn correlation(&self) -> Option<f64> {
        self.fit.and_then(|fit| fit.correlation)
    }
}

/// Splits records by `main_artist`, in first-seen order.
fn by_group(records: &[EnrichedTrackRecord]) -> Vec<(&str, Vec<&EnrichedTrackRecord>)> {
    let mut groups: Vec<(&str, Vec<&EnrichedTrackRecord>)> = Vec::new();
    for record in records {
        match groups
            .iter_mut()
            .find(|(group, _)| *group == record.main_artist)
        {
            Some((_, members)) => members.push(record),
            None => groups.push((&record.main_artist, vec![record])),
        }
    }
    groups
}

/// Fits `y` against `x` per group, sorted by correlation ascending (the
/// steepest decay first) with undefined correlations last.
pub fn group_diagnostics(
    records: &[EnrichedTrackRecord],
    x: Metric,
    y: Metric,
) -> Vec<GroupDiagnostic> {
    let mut diagnostics: Vec<GroupDiagnostic> = by_group(records)
        .into_iter()
        .map(|(group, members)| {
            let xs: Vec<Option<f64>> = members.iter().map(|r| x.value_of(r)).collect();
            let ys: Vec<Option<f64>> = members.iter().map(|r| y.value_of(r)).collect();
            let n = xs
                .iter()
                .zip(&ys)
                .filter(|(x, y)| x.is_some() && y.is_some())
                .count();
            GroupDiagnostic {
                group: group.to_string(),
                n,
                fit: fit_linear(&xs, &ys),
            }
        })
        .collect();

    diagnostics.sort_by(|a, b| match (a.correlation(), b.correlation()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    diagnostics
}

/// Averages of one group. Means cover defined values only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub tracks: usize,
    pub mean_popularity: Option<f64>,
    pub mean_duration_min: Option<f64>,
    pub mean_age_years: Option<f64>,
    pub mean_staying_index: Option<f64>,
    /// Share of explicit tracks, in percent
    pub explicit_rate: f64,
    /// Share of tracks with more than one credited artist, in percent
    pub collab_rate: f64,
}

pub fn summarize_groups(records: &[EnrichedTrackRecord]) -> Vec<GroupSummary> {
    by_group(records)
        .into_iter()
        .map(|(group, members)| {
            let tracks = members.len();
            let percent = |count: usize| round2(count as f64 * 100.0 / tracks as f64);
            GroupSummary {
                group: group.to_string(),
                tracks,
                mean_popularity: mean(members.iter().map(|r| r.popularity())).map(round2),
                mean_duration_min: mean(members.iter().map(|r| r.duration_min)).map(round2),
                mean_age_years: mean(members.iter().map(|r| r.age_years)).map(round2),
                mean_staying_index: mean(members.iter().map(|r| r.staying_index)).map(round2),
                explicit_rate: percent(members.iter().filter(|r| r.track.explicit).count()),
                collab_rate: percent(members.iter().filter(|r| r.collab_flag).count()),
            }
        })
        .collect()
}

/// Granularity of a release histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePeriod {
    Year,
    /// Month of the year, 1-12
    Month,
    /// Quarter of the year, 1-4
    Quarter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseCount {
    pub group: String,
    pub period: i32,
    pub tracks: usize,
}

/// Track counts per group and release period, ordered by period then by
/// group in first-seen order. Records whose period is undefined are skipped.
pub fn release_counts(records: &[EnrichedTrackRecord], period: ReleasePeriod) -> Vec<ReleaseCount> {
    let mut counts: Vec<(usize, i32, usize)> = Vec::new();

    for (group_index, (_, members)) in by_group(records).iter().enumerate() {
        for record in members {
            let value = match period {
                ReleasePeriod::Year => record.release_year,
                ReleasePeriod::Month => record.release_month.map(|m| m as i32),
                ReleasePeriod::Quarter => record.release_quarter.map(|q| q as i32),
            };
            let Some(value) = value else {
                continue;
            };
            match counts
                .iter_mut()
                .find(|(g, p, _)| *g == group_index && *p == value)
            {
                Some((_, _, tracks)) => *tracks += 1,
                None => counts.push((group_index, value, 1)),
            }
        }
    }

    let groups: Vec<String> = by_group(records)
        .into_iter()
        .map(|(group, _)| group.to_string())
        .collect();
    counts.sort_by_key(|(group, value, _)| (*value, *group));
    counts
        .into_iter()
        .map(|(group, period, tracks)| ReleaseCount {
            group: groups[group].clone(),
            period,
            tracks,
        })
        .collect()
}
