use super::CollectError;

/// What happened to one requested artist.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtistOutcome {
    Collected {
        /// Catalog id, absent for strategies that never resolve the artist
        artist_id: Option<String>,
        /// Rows gathered for this artist before the cross-artist merge
        tracks: usize,
        /// Albums whose track listing failed and were left out
        skipped_albums: usize,
        /// Skipped albums whose listing failed with a retryable error
        retryable_skips: usize,
    },
    Failed(CollectError),
    /// Not attempted because the running target was already met
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistReport {
    pub artist: String,
    pub outcome: ArtistOutcome,
}

/// Per-artist diagnostics of one collection run, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionReport {
    pub artists: Vec<ArtistReport>,
}

impl CollectionReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &CollectError)> {
        self.artists.iter().filter_map(|report| match &report.outcome {
            ArtistOutcome::Failed(err) => Some((report.artist.as_str(), err)),
            _ => None,
        })
    }

    /// At least one artist failed.
    pub fn is_partial_failure(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Some artist failed, or left out an album, because of an error that
    /// may not happen again.
    pub fn has_retryable_failure(&self) -> bool {
        self.failures().any(|(_, err)| err.is_retryable())
            || self.artists.iter().any(|report| {
                matches!(
                    report.outcome,
                    ArtistOutcome::Collected { retryable_skips, .. } if retryable_skips > 0
                )
            })
    }

    pub fn skipped_artists(&self) -> impl Iterator<Item = &str> {
        self.artists
            .iter()
            .filter(|report| report.outcome == ArtistOutcome::Skipped)
            .map(|report| report.artist.as_str())
    }

    pub fn skipped_albums(&self) -> usize {
        self.artists
            .iter()
            .map(|report| match report.outcome {
                ArtistOutcome::Collected { skipped_albums, .. } => skipped_albums,
                _ => 0,
            })
            .sum()
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for report in &self.artists {
            match report.outcome {
                ArtistOutcome::Collected { .. } => summary.collected += 1,
                ArtistOutcome::Failed(_) => summary.failed += 1,
                ArtistOutcome::Skipped => summary.skipped += 1,
            }
        }
        summary.skipped_albums = self.skipped_albums();
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub collected: usize,
    pub failed: usize,
    pub skipped: usize,
    pub skipped_albums: usize,
}
