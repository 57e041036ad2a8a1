//! Publish orchestration: list, classify, upload, prune.
//!
//! One run makes a single list call, at most one upload, and then the queued
//! deletions one at a time in queue order. Any failure aborts the run; work
//! already committed on the server (an upload, earlier deletions) stays.

use anyhow::{Context, Result};
use time::Date;

use crate::config::PublishConfig;
use crate::github::{AssetUpload, ReleaseStore};
use crate::output;
use crate::retention::{classify, sort_oldest_first};
use crate::template::generate_asset_name;

/// How a publish run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// An asset for the current commit already exists; nothing was changed.
    AlreadyPublished { asset_name: String },
    /// The asset was uploaded and the listed old assets were deleted.
    Uploaded {
        name: String,
        url: String,
        deleted: Vec<u64>,
    },
    /// Dry run: what would have been uploaded and deleted.
    DryRun { name: String, to_delete: Vec<u64> },
}

impl PublishOutcome {
    pub fn uploaded(&self) -> bool {
        matches!(self, PublishOutcome::Uploaded { .. })
    }

    /// Download URL of the uploaded asset.
    pub fn url(&self) -> Option<&str> {
        match self {
            PublishOutcome::Uploaded { url, .. } => Some(url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// List and classify only; skip the file read, upload and deletions.
    pub dry_run: bool,
}

/// Runs one publish against `store`.
///
/// `today` is the UTC date stamped into the new asset name and `short_hash`
/// the commit tag.
pub fn publish(
    config: &PublishConfig,
    store: &dyn ReleaseStore,
    short_hash: &str,
    today: Date,
    options: PublishOptions,
) -> Result<PublishOutcome> {
    output::action("Checking", &format!("assets of release {}", config.release_id));
    let mut assets = store
        .list_assets(config.release_id)
        .context("Failed to list existing release assets")?;
    sort_oldest_first(&mut assets);

    if output::is_verbose() {
        for asset in &assets {
            output::detail(&format!("{} (id {}, created {})", asset.name, asset.id, asset.created_at));
        }
    }

    let classification = classify(&assets, &config.template, short_hash, config.max_releases);
    if classification.duplicate {
        let asset_name = assets
            .iter()
            .find(|a| config.template.matches_commit(&a.name, short_hash))
            .map(|a| a.name.clone())
            .unwrap_or_default();
        output::note(&format!(
            "Commit {short_hash} already released as '{asset_name}', nothing to do"
        ));
        return Ok(PublishOutcome::AlreadyPublished { asset_name });
    }

    for id in &classification.to_delete {
        if let Some(asset) = assets.iter().find(|a| a.id == *id) {
            output::detail(&format!("Queued old asset {} for deletion", asset.name));
        }
    }

    let name = generate_asset_name(&config.template, today, short_hash);

    if options.dry_run {
        output::note(&format!(
            "Dry run: would upload '{name}' and delete {} old asset(s)",
            classification.to_delete.len()
        ));
        return Ok(PublishOutcome::DryRun {
            name,
            to_delete: classification.to_delete,
        });
    }

    let bytes = std::fs::read(&config.asset_path).with_context(|| {
        format!("Failed to read asset file {}", config.asset_path.display())
    })?;

    output::action("Uploading", &format!("{name} ({} bytes)", bytes.len()));
    let uploaded = store.upload_asset(&AssetUpload {
        upload_url: &config.upload_url,
        name: &name,
        content_type: &config.content_type,
        bytes,
    })?;
    output::success("Uploaded", &uploaded.browser_download_url);

    if !classification.to_delete.is_empty() {
        output::action(
            "Deleting",
            &format!("{} old asset(s)", classification.to_delete.len()),
        );
    }
    for id in &classification.to_delete {
        store.delete_asset(*id)?;
        output::detail(&format!("Deleted asset {id}"));
    }

    Ok(PublishOutcome::Uploaded {
        name,
        url: uploaded.browser_download_url,
        deleted: classification.to_delete,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
