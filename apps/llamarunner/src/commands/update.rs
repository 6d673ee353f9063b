//! Update command for llamarunner.
//!
//! Replaces the running binary with the latest published release.
//!
//! ## Usage
//!
//! ```bash
//! llamarunner update            # Install the latest release if newer
//! llamarunner update --check    # Only show what the latest release is
//! llamarunner update --force    # Reinstall even when up to date
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use super::registry::{BIN_NAME, Command, CommandContext, parse_args, usage_of};
use crate::config::{Layout, SettingsStore};
use crate::errors::RunnerError;
use crate::toolchain::{Platform, Release, download_binary, fetch_latest_release, verify_sha256};

/// Arguments for the update command.
#[derive(Parser, Debug)]
#[command(name = "update", about = "Update llamarunner to the latest release")]
pub struct UpdateArgs {
    /// Only report the latest release and its notes.
    #[arg(long)]
    pub check: bool,

    /// Reinstall even when already up to date.
    #[arg(long, conflicts_with = "check")]
    pub force: bool,
}

/// `update [--check] [--force]`
pub struct UpdateCommand;

impl Command for UpdateCommand {
    fn name(&self) -> &'static str {
        "update"
    }

    fn description(&self) -> &'static str {
        "Update llamarunner to the latest release"
    }

    fn usage(&self) -> String {
        usage_of::<UpdateArgs>(self.name())
    }

    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<UpdateArgs>(self.name(), args)? else {
            return Ok(());
        };

        let mut target = SelfBinary::new()?;
        execute(ctx.layout, &args, &mut target)
    }
}

/// Everything an update touches outside the settings file.
trait UpdateTarget {
    fn latest_release(&mut self) -> Result<Release>;

    fn platform(&self) -> Result<Platform>;

    /// Where the new binary is written before it replaces the current one.
    fn staging_path(&self) -> Result<PathBuf>;

    /// Downloads `url` to `dest` and returns the SHA-256 of what was written.
    fn download(&mut self, url: &str, dest: &Path) -> Result<String>;

    /// Moves the staged binary over the running one.
    fn install(&mut self, staged: &Path) -> Result<()>;
}

/// The running executable, updated over HTTP.
struct SelfBinary {
    runtime: tokio::runtime::Runtime,
}

impl SelfBinary {
    fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        Ok(Self { runtime })
    }

    fn current_exe() -> Result<PathBuf> {
        std::env::current_exe().context("Failed to get current executable path")
    }
}

impl UpdateTarget for SelfBinary {
    fn latest_release(&mut self) -> Result<Release> {
        self.runtime.block_on(fetch_latest_release())
    }

    fn platform(&self) -> Result<Platform> {
        Ok(Platform::detect()?)
    }

    fn staging_path(&self) -> Result<PathBuf> {
        // Same directory as the executable, so the final rename is atomic.
        Ok(Self::current_exe()?.with_extension("new"))
    }

    fn download(&mut self, url: &str, dest: &Path) -> Result<String> {
        self.runtime
            .block_on(download_binary(url, dest))
            .with_context(|| {
                format!(
                    "Failed to download to {}. You may need to run with elevated privileges.",
                    dest.display()
                )
            })
    }

    fn install(&mut self, staged: &Path) -> Result<()> {
        let current_exe = Self::current_exe()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            std::fs::set_permissions(staged, std::fs::Permissions::from_mode(0o755))
                .with_context(|| format!("Failed to set permissions: {}", staged.display()))?;
        }

        std::fs::rename(staged, &current_exe).with_context(|| {
            format!(
                "Failed to replace {}. You may need to run with elevated privileges.",
                current_exe.display()
            )
        })
    }
}

/// # Process
///
/// 1. Fetch the latest release and compare with the `version` setting
/// 2. Pick the asset for this platform
/// 3. Download it next to the executable, hashing as it streams
/// 4. Check the hash when the release publishes one
/// 5. Replace the executable and record the new version
fn execute(layout: &Layout, args: &UpdateArgs, target: &mut dyn UpdateTarget) -> Result<()> {
    let store = SettingsStore::new(layout);
    let mut settings = store.load();

    println!("Current {BIN_NAME} version: {}", settings.version);
    println!("Checking for updates...");
    let release = target.latest_release()?;
    let up_to_date = release.is_up_to_date(&settings.version);

    if args.check {
        print!("{}", render_check(&release, up_to_date));
        return Ok(());
    }

    if up_to_date && !args.force {
        println!(
            "{BIN_NAME} is already up to date (current: {}, latest: {}).",
            settings.version,
            release.version()
        );
        return Ok(());
    }

    let platform = target.platform()?;
    let asset = release.asset_for(platform).ok_or_else(|| {
        RunnerError::release(format!(
            "release {} has no {} binary",
            release.tag_name,
            platform.asset_name()
        ))
    })?;

    println!(
        "Updating {BIN_NAME} from {} to {}...",
        settings.version,
        release.version()
    );

    let staged = target.staging_path()?;
    println!("Downloading {}...", asset.browser_download_url);
    let actual = target.download(&asset.browser_download_url, &staged)?;

    match asset.sha256() {
        Some(expected) => {
            if let Err(e) = verify_sha256(expected, &actual) {
                std::fs::remove_file(&staged).ok();
                return Err(anyhow::Error::new(e)
                    .context(format!("Downloaded {} is corrupted", asset.name)));
            }
            println!("Checksum verified.");
        }
        None => log::warn!(
            "release asset {} has no sha256 digest; skipping verification",
            asset.name
        ),
    }

    if let Err(e) = target.install(&staged) {
        std::fs::remove_file(&staged).ok();
        return Err(e);
    }

    settings.version = release.version().to_string();
    store.save(&settings)?;

    println!("Successfully updated {BIN_NAME} to {}.", release.version());
    Ok(())
}

fn render_check(release: &Release, up_to_date: bool) -> String {
    let mut out = format!(
        "Latest release: {} ({})\n",
        release.display_name(),
        release.tag_name
    );
    if let Some(body) = release.body.as_deref().map(str::trim)
        && !body.is_empty()
    {
        out.push_str("\nRelease notes:\n");
        out.push_str(body);
        out.push('\n');
    }
    out.push('\n');
    if up_to_date {
        out.push_str(&format!("{BIN_NAME} is up to date.\n"));
    } else {
        out.push_str(&format!("Run '{BIN_NAME} update' to install it.\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::registry::testing::TestEnv;
    use crate::toolchain::release::Asset;
    use assert_fs::TempDir;

    const PAYLOAD_SHA256: &str =
        "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447";

    fn release(body: Option<&str>) -> Release {
        Release {
            tag_name: "v0.4.0".to_string(),
            name: Some("llamarunner 0.4.0".to_string()),
            body: body.map(ToString::to_string),
            assets: Vec::new(),
        }
    }

    fn release_with_asset(digest: Option<&str>) -> Release {
        Release {
            assets: vec![Asset {
                name: "llamarunner-linux-amd64".to_string(),
                browser_download_url: "https://example.com/llamarunner-linux-amd64".to_string(),
                digest: digest.map(ToString::to_string),
            }],
            ..release(None)
        }
    }

    /// Serves a fixed release and stages downloads inside a temp dir.
    struct FakeTarget {
        release: Release,
        staging: PathBuf,
        downloads: Vec<String>,
        installed: Vec<PathBuf>,
    }

    impl FakeTarget {
        fn new(temp: &TempDir, release: Release) -> Self {
            Self {
                release,
                staging: temp.path().join("llamarunner.new"),
                downloads: Vec::new(),
                installed: Vec::new(),
            }
        }
    }

    impl UpdateTarget for FakeTarget {
        fn latest_release(&mut self) -> Result<Release> {
            Ok(self.release.clone())
        }

        fn platform(&self) -> Result<Platform> {
            Ok(Platform::LinuxAmd64)
        }

        fn staging_path(&self) -> Result<PathBuf> {
            Ok(self.staging.clone())
        }

        fn download(&mut self, url: &str, dest: &Path) -> Result<String> {
            self.downloads.push(url.to_string());
            std::fs::write(dest, "hello world\n")?;
            Ok(PAYLOAD_SHA256.to_string())
        }

        fn install(&mut self, staged: &Path) -> Result<()> {
            self.installed.push(staged.to_path_buf());
            Ok(())
        }
    }

    fn args(check: bool, force: bool) -> UpdateArgs {
        UpdateArgs { check, force }
    }

    fn save_version(env: &TestEnv, version: &str) {
        let store = SettingsStore::new(&env.layout);
        let mut settings = store.load();
        settings.version = version.to_string();
        store.save(&settings).unwrap();
    }

    fn stored_version(env: &TestEnv) -> String {
        SettingsStore::new(&env.layout).load().version
    }

    #[test]
    fn check_output_shows_notes_and_hint() {
        let out = render_check(&release(Some("- faster builds\n")), false);
        assert_eq!(
            out,
            "Latest release: llamarunner 0.4.0 (v0.4.0)\n\n\
             Release notes:\n- faster builds\n\n\
             Run 'llamarunner update' to install it.\n"
        );
    }

    #[test]
    fn check_output_without_notes_when_up_to_date() {
        let out = render_check(&release(None), true);
        assert_eq!(
            out,
            "Latest release: llamarunner 0.4.0 (v0.4.0)\n\nllamarunner is up to date.\n"
        );
    }

    #[test]
    fn check_and_force_conflict() {
        let mut env = TestEnv::new();
        let err = env.run(&["update", "--check", "--force"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn check_only_never_downloads() {
        let env = TestEnv::new();
        save_version(&env, "0.3.0");
        let mut target = FakeTarget::new(&env.temp, release_with_asset(None));

        execute(&env.layout, &args(true, false), &mut target).unwrap();

        assert!(target.downloads.is_empty());
        assert_eq!(stored_version(&env), "0.3.0");
    }

    #[test]
    fn up_to_date_skips_download() {
        let env = TestEnv::new();
        save_version(&env, "0.4.0");
        let mut target = FakeTarget::new(&env.temp, release_with_asset(Some(PAYLOAD_SHA256)));

        execute(&env.layout, &args(false, false), &mut target).unwrap();

        assert!(target.downloads.is_empty());
        assert!(target.installed.is_empty());
    }

    #[test]
    fn force_reinstalls_when_up_to_date() {
        let env = TestEnv::new();
        save_version(&env, "v0.4.0");
        let mut target = FakeTarget::new(&env.temp, release_with_asset(Some(PAYLOAD_SHA256)));

        execute(&env.layout, &args(false, true), &mut target).unwrap();

        assert_eq!(target.downloads.len(), 1);
        assert_eq!(target.installed, vec![target.staging.clone()]);
        assert_eq!(stored_version(&env), "0.4.0");
    }

    #[test]
    fn newer_release_is_installed_and_version_saved() {
        let env = TestEnv::new();
        save_version(&env, "0.3.0");
        let mut target = FakeTarget::new(&env.temp, release_with_asset(Some(PAYLOAD_SHA256)));

        execute(&env.layout, &args(false, false), &mut target).unwrap();

        assert_eq!(
            target.downloads,
            vec!["https://example.com/llamarunner-linux-amd64"]
        );
        assert_eq!(target.installed, vec![target.staging.clone()]);
        assert_eq!(stored_version(&env), "0.4.0");
    }

    #[test]
    fn release_without_platform_asset_fails() {
        let env = TestEnv::new();
        save_version(&env, "0.3.0");
        let mut target = FakeTarget::new(&env.temp, release(None));

        let err = execute(&env.layout, &args(false, false), &mut target).unwrap_err();

        match err.downcast_ref::<RunnerError>() {
            Some(RunnerError::Release { message }) => {
                assert!(message.contains("has no llamarunner-linux-amd64 binary"), "{message}");
            }
            other => panic!("expected release error, got {other:?}"),
        }
        assert!(target.downloads.is_empty());
        assert_eq!(stored_version(&env), "0.3.0");
    }

    #[test]
    fn checksum_mismatch_removes_download_and_keeps_version() {
        let env = TestEnv::new();
        save_version(&env, "0.3.0");
        let mut target = FakeTarget::new(&env.temp, release_with_asset(Some("sha256:00ff")));

        let err = execute(&env.layout, &args(false, false), &mut target).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::ChecksumMismatch { .. })
        ));
        assert!(!target.staging.exists());
        assert!(target.installed.is_empty());
        assert_eq!(stored_version(&env), "0.3.0");
    }

    #[test]
    fn missing_digest_still_installs() {
        let env = TestEnv::new();
        save_version(&env, "0.3.0");
        let mut target = FakeTarget::new(&env.temp, release_with_asset(None));

        execute(&env.layout, &args(false, false), &mut target).unwrap();

        assert_eq!(target.installed.len(), 1);
        assert_eq!(stored_version(&env), "0.4.0");
    }
}
