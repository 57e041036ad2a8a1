use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use time::OffsetDateTime;

use nightly_publish::actions;
use nightly_publish::config::{FileConfig, GitHubEnv, PublishConfig, PublishInputs};
use nightly_publish::github::GitHubClient;
use nightly_publish::output;
use nightly_publish::publish::{PublishOptions, PublishOutcome, publish};

/// Upload a nightly build artifact to a GitHub release and prune old ones.
///
/// Inputs are read from flags, then from the `INPUT_*` variables the Actions
/// runner sets, then from `--config`. The commit, repository and token come
/// from `GITHUB_SHA`, `GITHUB_REPOSITORY` and `GITHUB_TOKEN`.
#[derive(Parser, Debug)]
#[command(
    name = "nightly-publish",
    version,
    about,
    after_help = "Examples:\n  nightly-publish --release-id 42 --asset-path dist/app.zip \\\n      --asset-content-type application/zip --asset-name 'app-$$.zip' \\\n      --upload-url \"$UPLOAD_URL\" --max-releases 7\n  nightly-publish --config publish.toml --dry-run"
)]
struct Cli {
    /// The release's upload URL (its `upload_url` field).
    #[arg(long, env = "INPUT_UPLOAD_URL")]
    upload_url: Option<String>,

    /// Path of the file to upload.
    #[arg(long, env = "INPUT_ASSET_PATH")]
    asset_path: Option<String>,

    /// Content type sent with the upload, e.g. application/zip.
    #[arg(long, env = "INPUT_ASSET_CONTENT_TYPE")]
    asset_content_type: Option<String>,

    /// Number of assets from this template to keep, including the new one.
    #[arg(long, env = "INPUT_MAX_RELEASES")]
    max_releases: Option<String>,

    /// Numeric id of the release to publish into.
    #[arg(long, env = "INPUT_RELEASE_ID")]
    release_id: Option<String>,

    /// Asset name template; `$$` is replaced by `<YYYYMMDD>-<short sha>`.
    #[arg(long, env = "INPUT_ASSET_NAME")]
    asset_name: Option<String>,

    /// TOML file with fallback values for any of the inputs.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// List and classify assets, but do not upload or delete anything.
    #[arg(long)]
    dry_run: bool,

    /// Print every asset considered and every deletion.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn inputs(&self) -> PublishInputs {
        PublishInputs {
            upload_url: self.upload_url.clone(),
            asset_path: self.asset_path.clone(),
            asset_content_type: self.asset_content_type.clone(),
            max_releases: self.max_releases.clone(),
            release_id: self.release_id.clone(),
            asset_name: self.asset_name.clone(),
        }
    }
}

fn run(cli: &Cli) -> Result<PublishOutcome> {
    let file = match &cli.config {
        Some(path) => FileConfig::load_from(path)?,
        None => FileConfig::default(),
    };
    let config = PublishConfig::from_inputs(&cli.inputs().or(file.inputs()))?;
    let env = GitHubEnv::from_env(&file)?;

    let client = GitHubClient::new(&env.api_url, env.repository.clone(), env.token.clone())?;
    let today = OffsetDateTime::now_utc().date();
    let outcome = publish(
        &config,
        &client,
        &env.short_hash,
        today,
        PublishOptions {
            dry_run: cli.dry_run,
        },
    )?;

    actions::write_outputs(&outcome)?;
    Ok(outcome)
}

fn main() {
    let cli = Cli::parse();
    output::set_verbose(cli.verbose);

    if let Err(e) = run(&cli) {
        let message = format!("{e:#}");
        output::fail("Failed", &message);
        actions::set_failed(&message);
        process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
