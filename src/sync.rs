//! Git repository sync.
//!
//! Keeps a local checkout of the configured docs repository current:
//!
//! 1. Resolve the checkout directory ([`RepositoryConfig::checkout_dir`]).
//! 2. Clone (shallow, single branch if configured) or fetch and hard reset.
//! 3. Return the docs directory inside the checkout.
//!
//! Requires `git` on `PATH`.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::RepositoryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Cloned,
    Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub action: SyncAction,
    pub checkout: PathBuf,
    pub docs_root: PathBuf,
    /// HEAD commit after the sync, if it could be read.
    pub head: Option<String>,
}

/// Clone or update the repository. Blocking.
pub fn sync_repository(repo: &RepositoryConfig) -> Result<SyncOutcome> {
    let checkout = repo.checkout_dir();

    let action = if checkout.join(".git").exists() {
        git_pull(&checkout, &repo.branch)?;
        SyncAction::Updated
    } else {
        git_clone(&repo.url, &repo.branch, repo.shallow, &checkout)?;
        SyncAction::Cloned
    };

    let docs_root = docs_root(repo);
    if !docs_root.exists() {
        bail!(
            "Docs directory '{}' does not exist in repo {}",
            repo.docs_dir,
            repo.url
        );
    }

    let head = git_head_sha(&checkout).ok();
    tracing::info!(
        url = %repo.url,
        branch = %repo.branch,
        action = ?action,
        head = head.as_deref().unwrap_or("unknown"),
        "repository synced"
    );

    Ok(SyncOutcome {
        action,
        checkout,
        docs_root,
        head,
    })
}

/// Run [`sync_repository`] on the blocking pool.
pub async fn sync_repository_async(repo: RepositoryConfig) -> Result<SyncOutcome> {
    tokio::task::spawn_blocking(move || sync_repository(&repo))
        .await
        .context("repository sync task panicked")?
}

/// Docs directory inside the checkout, whether or not it exists yet.
pub fn docs_root(repo: &RepositoryConfig) -> PathBuf {
    let checkout = repo.checkout_dir();
    if repo.docs_dir.is_empty() || repo.docs_dir == "." {
        checkout
    } else {
        checkout.join(&repo.docs_dir)
    }
}

fn git_clone(url: &str, branch: &str, shallow: bool, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
    }

    let mut cmd = Command::new("git");
    cmd.args(["clone", "--branch", branch, "--single-branch"]);
    if shallow {
        cmd.args(["--depth", "1"]);
    }
    cmd.arg(url);
    cmd.arg(dest);

    let output = cmd
        .output()
        .with_context(|| "Failed to execute 'git clone'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(())
}

fn git_pull(repo_dir: &Path, branch: &str) -> Result<()> {
    run_git(repo_dir, &["fetch", "origin", branch])?;
    let remote_ref = format!("origin/{}", branch);
    run_git(repo_dir, &["reset", "--hard", &remote_ref])?;
    Ok(())
}

fn git_head_sha(repo_dir: &Path) -> Result<String> {
    let stdout = run_git(repo_dir, &["rev-parse", "HEAD"])?;
    Ok(stdout.trim().to_string())
}

fn run_git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .with_context(|| format!("Failed to execute 'git {}'", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args[0], stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(cache: &Path, docs_dir: &str) -> RepositoryConfig {
        RepositoryConfig {
            url: "https://example.invalid/klipper.git".to_string(),
            branch: "master".to_string(),
            docs_dir: docs_dir.to_string(),
            shallow: true,
            cache_dir: Some(cache.to_path_buf()),
            sync_interval_secs: None,
        }
    }

    #[test]
    fn test_docs_root() {
        let cache = Path::new("/tmp/kdocs-cache");
        assert_eq!(docs_root(&repo(cache, "docs")), cache.join("docs"));
        assert_eq!(docs_root(&repo(cache, ".")), cache.to_path_buf());
    }

    #[test]
    fn test_sync_local_repository() {
        if Command::new("git").arg("--version").output().is_err() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(origin.path())
                .env("GIT_AUTHOR_NAME", "t")
                .env("GIT_AUTHOR_EMAIL", "t@example.com")
                .env("GIT_COMMITTER_NAME", "t")
                .env("GIT_COMMITTER_EMAIL", "t@example.com")
                .status()
                .unwrap();
            assert!(status.success(), "git {:?} failed", args);
        };
        run(&["init", "-q", "-b", "master"]);
        std::fs::create_dir_all(origin.path().join("docs")).unwrap();
        std::fs::write(origin.path().join("docs/Overview.md"), "# Overview").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "init"]);

        let cache = tempfile::tempdir().unwrap();
        let mut config = repo(&cache.path().join("checkout"), "docs");
        config.url = format!("file://{}", origin.path().display());

        let first = sync_repository(&config).unwrap();
        assert_eq!(first.action, SyncAction::Cloned);
        assert!(first.docs_root.join("Overview.md").exists());

        let second = sync_repository(&config).unwrap();
        assert_eq!(second.action, SyncAction::Updated);
        assert_eq!(first.head, second.head);
    }
}
