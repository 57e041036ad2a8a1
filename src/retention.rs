//! Classification of existing release assets.
//!
//! Decides, from the assets already attached to a release, whether the current
//! commit has been published and which older assets exceed the retention
//! threshold.

use std::num::NonZeroUsize;

use crate::github::ReleaseAsset;
use crate::template::NameTemplate;

/// Result of scanning a release's assets against a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// The current commit's asset is already attached to the release.
    pub duplicate: bool,
    /// Asset ids to delete after uploading, oldest first.
    pub to_delete: Vec<u64>,
}

impl Classification {
    fn already_published() -> Self {
        Self {
            duplicate: true,
            to_delete: Vec::new(),
        }
    }
}

/// Scans `assets` (sorted oldest first) for the template's prior uploads.
///
/// Returns as soon as an asset for `short_hash` is seen; nothing is queued for
/// deletion in that case. Otherwise, with `n` prior matches and a threshold of
/// `m`, the oldest `n - (m - 1)` matches are queued so that the release holds
/// `m` matching assets once the new one is uploaded. `None` disables pruning.
pub fn classify(
    assets: &[ReleaseAsset],
    template: &NameTemplate,
    short_hash: &str,
    max_releases: Option<NonZeroUsize>,
) -> Classification {
    let mut prior = Vec::new();
    for asset in assets.iter().filter(|a| template.matches(&a.name)) {
        if template.matches_commit(&asset.name, short_hash) {
            return Classification::already_published();
        }
        prior.push(asset);
    }

    let Some(max) = max_releases else {
        return Classification::default();
    };

    // Keep max - 1 prior assets; the upload brings the total back to max.
    let keep = max.get() - 1;
    let overflow = prior.len().saturating_sub(keep);
    Classification {
        duplicate: false,
        to_delete: prior[..overflow].iter().map(|a| a.id).collect(),
    }
}

/// Sorts assets by creation time, oldest first. Ties keep their listed order.
pub fn sort_oldest_first(assets: &mut [ReleaseAsset]) {
    assets.sort_by_key(|a| a.created_at);
}
