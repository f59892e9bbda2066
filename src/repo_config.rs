//! Persisted GitHub publishing settings and CDN URL derivation.
//!
//! The record lives at `<config dir>/gridcrop/github-repo.toml`:
//!
//! ```toml
//! owner = "octocat"
//! repo = "img[0-20]"
//! branch = "main"
//! path_prefix = "2024/05/01"
//! token = "ghp_..."
//! ```
//!
//! `repo` may be a range pattern `name[min,max]` or `name[min-max]`; each
//! publish picks one of `name<min>` ..= `name<max>` at random, spreading
//! uploads over several repositories.
//!
//! Loading never fails: a missing or unreadable record yields defaults, and a
//! blank `path_prefix` becomes today's `YYYY/MM/DD`. Saving is best-effort.

use crate::config::merge_toml;
use crate::naming::join_remote_path;
use chrono::{Local, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BRANCH: &str = "main";
pub const JSDELIVR_BASE: &str = "https://fastly.jsdelivr.net/gh";
pub const RAW_BASE: &str = "https://raw.githubusercontent.com";
const RECORD_FILE: &str = "github-repo.toml";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("No user config directory on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub owner: String,
    /// Repository name or range pattern.
    pub repo: String,
    pub branch: String,
    #[serde(alias = "pathPrefix")]
    pub path_prefix: String,
    pub token: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            path_prefix: String::new(),
            token: String::new(),
        }
    }
}

impl RepoConfig {
    /// Overwrite every field from a JSON object.
    ///
    /// Missing fields become empty, every value is trimmed, and a blank branch
    /// becomes `main`. Non-object input is ignored and `false` is returned.
    pub fn import(&mut self, value: &serde_json::Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        let field = |keys: &[&str]| -> String {
            keys.iter()
                .find_map(|k| obj.get(*k))
                .map(json_to_string)
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        self.owner = field(&["owner"]);
        self.repo = field(&["repo"]);
        self.branch = field(&["branch"]);
        if self.branch.is_empty() {
            self.branch = DEFAULT_BRANCH.to_string();
        }
        self.path_prefix = field(&["pathPrefix", "path_prefix"]);
        self.token = field(&["token"]);
        true
    }

    /// JSON object in the shape [`import`](Self::import) accepts.
    pub fn export(&self) -> serde_json::Value {
        serde_json::json!({
            "owner": self.owner,
            "repo": self.repo,
            "branch": self.effective_branch(),
            "pathPrefix": self.path_prefix,
            "token": self.token,
        })
    }

    pub fn effective_branch(&self) -> &str {
        match self.branch.trim() {
            "" => DEFAULT_BRANCH,
            branch => branch,
        }
    }

    /// Reset the prefix to today's date.
    pub fn set_path_prefix_to_today(&mut self) {
        self.path_prefix = current_date_path();
    }

    /// Repository path for `name` under the configured prefix.
    pub fn remote_path(&self, name: &str) -> String {
        join_remote_path(self.path_prefix.trim(), name)
    }

    /// jsDelivr URL for `path` under the prefix, resolving the repo pattern.
    ///
    /// An empty `path` yields the URL of the prefix itself. `None` when owner
    /// or repo is missing.
    pub fn jsdelivr_url(&self, path: &str) -> Option<String> {
        let owner = self.owner.trim();
        let repo = resolve_repo_name(&self.repo);
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        let prefix = self.path_prefix.trim().trim_end_matches('/');
        let path = path.trim();
        let full = match (prefix.is_empty(), path.is_empty()) {
            (_, true) => prefix.to_string(),
            (true, false) => path.to_string(),
            (false, false) => collapse_slashes(&format!("{prefix}/{path}")),
        };
        Some(format!(
            "{JSDELIVR_BASE}/{owner}/{repo}@{}/{full}",
            self.effective_branch()
        ))
    }

    /// jsDelivr URL for an already-resolved repo and full repository path.
    pub fn jsdelivr_url_for_repo(&self, repo: &str, path: &str) -> Option<String> {
        let owner = self.owner.trim();
        let path = path.trim().trim_start_matches('/');
        if owner.is_empty() || repo.is_empty() || path.is_empty() {
            return None;
        }
        Some(format!(
            "{JSDELIVR_BASE}/{owner}/{repo}@{}/{path}",
            self.effective_branch()
        ))
    }

    /// `raw.githubusercontent.com` URL for a resolved repo and path.
    pub fn raw_url(&self, repo: &str, path: &str) -> Option<String> {
        let owner = self.owner.trim();
        let path = path.trim().trim_start_matches('/');
        if owner.is_empty() || repo.is_empty() || path.is_empty() {
            return None;
        }
        Some(format!(
            "{RAW_BASE}/{owner}/{repo}/{}/{path}",
            self.effective_branch()
        ))
    }
}

fn json_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn collapse_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

/// `YYYY/MM/DD` for `date`.
pub fn date_path(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Today's date path in local time.
pub fn current_date_path() -> String {
    date_path(Local::now().date_naive())
}

/// Resolve a repo name or range pattern with the thread-local RNG.
pub fn resolve_repo_name(pattern: &str) -> String {
    resolve_repo_name_with(pattern, &mut rand::thread_rng())
}

/// Resolve a repo name or range pattern.
///
/// - `""` (after trim) → `""`
/// - `"img[0,20]"` / `"img[0-20]"` → `"img<n>"`, `n` uniform in `0..=20`
/// - reversed bounds are swapped
/// - anything else, including bounds that overflow `u64`, is returned as-is
pub fn resolve_repo_name_with<R: Rng + ?Sized>(pattern: &str, rng: &mut R) -> String {
    let trimmed = pattern.trim();
    match parse_range_pattern(trimmed) {
        Some((base, a, b)) => {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            format!("{base}{}", rng.gen_range(min..=max))
        }
        None => trimmed.to_string(),
    }
}

/// Split `base[min<sep>max]` into its parts. `sep` is `,` or `-`.
fn parse_range_pattern(s: &str) -> Option<(&str, u64, u64)> {
    let inner = s.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let (base, range) = (&inner[..open], &inner[open + 1..]);
    if base.is_empty() {
        return None;
    }
    let sep = range.find([',', '-'])?;
    let (lo, hi) = (&range[..sep], &range[sep + 1..]);
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_number(lo) || !is_number(hi) {
        return None;
    }
    Some((base, lo.parse().ok()?, hi.parse().ok()?))
}

/// Rename `pathPrefix` to `path_prefix` so the merge sees one key per field.
///
/// When both spellings are stored, `path_prefix` wins.
fn normalize_keys(mut stored: toml::Value) -> toml::Value {
    if let Some(table) = stored.as_table_mut() {
        if let Some(prefix) = table.remove("pathPrefix") {
            table.entry("path_prefix").or_insert(prefix);
        }
    }
    stored
}

/// Loads and saves the [`RepoConfig`] record.
#[derive(Debug, Clone)]
pub struct RepoConfigStore {
    path: PathBuf,
}

impl RepoConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<user config dir>/gridcrop/github-repo.toml`.
    pub fn default_location() -> Result<Self, StoreError> {
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(Self::new(dir.join("gridcrop").join(RECORD_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored values over defaults. Never fails.
    pub fn load(&self) -> RepoConfig {
        let mut config = match self.try_load() {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %self.path.display(), "No repo config stored, using defaults");
                RepoConfig::default()
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "Ignoring unreadable repo config");
                RepoConfig::default()
            }
        };
        if config.path_prefix.trim().is_empty() {
            config.set_path_prefix_to_today();
        }
        config
    }

    /// Stored values over defaults, without the date fallback.
    pub fn try_load(&self) -> Result<Option<RepoConfig>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let stored = normalize_keys(toml::from_str(&content)?);
        let base = toml::Value::try_from(RepoConfig::default())?;
        Ok(Some(merge_toml(base, stored).try_into()?))
    }

    /// Persist `config`. Failures are logged, never returned.
    pub fn save(&self, config: &RepoConfig) {
        if let Err(err) = self.try_save(config) {
            warn!(path = %self.path.display(), %err, "Failed to save repo config");
        }
    }

    pub fn try_save(&self, config: &RepoConfig) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string(config)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn configured() -> RepoConfig {
        RepoConfig {
            owner: "octocat".into(),
            repo: "img".into(),
            branch: "main".into(),
            path_prefix: "2024/05/01".into(),
            token: "t".into(),
        }
    }

    // =========================================================================
    // Range patterns
    // =========================================================================

    #[test]
    fn range_pattern_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let name = resolve_repo_name_with("img[0,20]", &mut rng);
            let n: u64 = name.strip_prefix("img").unwrap().parse().unwrap();
            assert!(n <= 20, "{name}");
        }
    }

    #[test]
    fn range_pattern_accepts_dash_and_reversed_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let name = resolve_repo_name_with("img[9-5]", &mut rng);
            let n: u64 = name.strip_prefix("img").unwrap().parse().unwrap();
            assert!((5..=9).contains(&n), "{name}");
        }
    }

    #[test]
    fn range_pattern_covers_both_ends() {
        let mut rng = StdRng::seed_from_u64(42);
        let seen: std::collections::HashSet<String> = (0..200)
            .map(|_| resolve_repo_name_with("r[1,2]", &mut rng))
            .collect();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn degenerate_range_is_single_value() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_repo_name_with("img[3-3]", &mut rng), "img3");
    }

    #[test]
    fn non_patterns_are_literal() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_repo_name_with("  photos  ", &mut rng), "photos");
        assert_eq!(resolve_repo_name_with("", &mut rng), "");
        assert_eq!(resolve_repo_name_with("   ", &mut rng), "");
        assert_eq!(resolve_repo_name_with("[1,2]", &mut rng), "[1,2]");
        assert_eq!(resolve_repo_name_with("img[a,2]", &mut rng), "img[a,2]");
        assert_eq!(resolve_repo_name_with("img[1;2]", &mut rng), "img[1;2]");
        assert_eq!(resolve_repo_name_with("img[1,2]x", &mut rng), "img[1,2]x");
        assert_eq!(
            resolve_repo_name_with("img[1,99999999999999999999999]", &mut rng),
            "img[1,99999999999999999999999]"
        );
    }

    #[test]
    fn nested_brackets_keep_greedy_base() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve_repo_name_with("a[1]b[4,4]", &mut rng), "a[1]b4");
    }

    // =========================================================================
    // URL derivation
    // =========================================================================

    #[test]
    fn jsdelivr_url_joins_prefix() {
        assert_eq!(
            configured().jsdelivr_url("a.jpg").as_deref(),
            Some("https://fastly.jsdelivr.net/gh/octocat/img@main/2024/05/01/a.jpg")
        );
    }

    #[test]
    fn jsdelivr_url_collapses_duplicate_slashes() {
        let config = RepoConfig {
            path_prefix: "2024//05/".into(),
            ..configured()
        };
        assert_eq!(
            config.jsdelivr_url("/a.jpg").as_deref(),
            Some("https://fastly.jsdelivr.net/gh/octocat/img@main/2024/05/a.jpg")
        );
    }

    #[test]
    fn jsdelivr_url_without_path_is_prefix() {
        assert_eq!(
            configured().jsdelivr_url("").as_deref(),
            Some("https://fastly.jsdelivr.net/gh/octocat/img@main/2024/05/01")
        );
    }

    #[test]
    fn jsdelivr_url_requires_owner_and_repo() {
        let no_owner = RepoConfig {
            owner: "  ".into(),
            ..configured()
        };
        assert_eq!(no_owner.jsdelivr_url("a.jpg"), None);

        let no_repo = RepoConfig {
            repo: String::new(),
            ..configured()
        };
        assert_eq!(no_repo.jsdelivr_url("a.jpg"), None);
    }

    #[test]
    fn jsdelivr_url_for_repo_strips_leading_slashes() {
        let config = RepoConfig {
            branch: " ".into(),
            ..configured()
        };
        assert_eq!(
            config.jsdelivr_url_for_repo("img7", "//2024/a.jpg").as_deref(),
            Some("https://fastly.jsdelivr.net/gh/octocat/img7@main/2024/a.jpg")
        );
        assert_eq!(config.jsdelivr_url_for_repo("img7", "  "), None);
        assert_eq!(config.jsdelivr_url_for_repo("", "a.jpg"), None);
    }

    #[test]
    fn raw_url_shape() {
        let config = RepoConfig {
            branch: "gh-pages".into(),
            ..configured()
        };
        assert_eq!(
            config.raw_url("img2", "2024/a.jpg").as_deref(),
            Some("https://raw.githubusercontent.com/octocat/img2/gh-pages/2024/a.jpg")
        );
    }

    #[test]
    fn remote_path_uses_prefix() {
        assert_eq!(configured().remote_path("a.jpg"), "2024/05/01/a.jpg");
        let bare = RepoConfig::default();
        assert_eq!(bare.remote_path("a.jpg"), "a.jpg");
    }

    #[test]
    fn date_path_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        assert_eq!(date_path(date), "2026/02/03");
    }

    // =========================================================================
    // Import / export
    // =========================================================================

    #[test]
    fn import_trims_and_defaults_branch() {
        let mut config = configured();
        let imported = config.import(&serde_json::json!({
            "owner": " octocat ",
            "repo": "img[0,3]",
            "branch": "   ",
            "pathPrefix": " uploads ",
        }));

        assert!(imported);
        assert_eq!(config.owner, "octocat");
        assert_eq!(config.repo, "img[0,3]");
        assert_eq!(config.branch, "main");
        assert_eq!(config.path_prefix, "uploads");
        assert_eq!(config.token, "");
    }

    #[test]
    fn import_ignores_non_objects() {
        let mut config = configured();
        assert!(!config.import(&serde_json::json!("nope")));
        assert_eq!(config, configured());
    }

    #[test]
    fn import_stringifies_scalars() {
        let mut config = RepoConfig::default();
        config.import(&serde_json::json!({ "repo": 42, "owner": null }));
        assert_eq!(config.repo, "42");
        assert_eq!(config.owner, "");
    }

    #[test]
    fn export_then_import_is_identity() {
        let mut copy = RepoConfig::default();
        copy.import(&configured().export());
        assert_eq!(copy, configured());
    }

    // =========================================================================
    // Store
    // =========================================================================

    #[test]
    fn load_missing_record_uses_defaults_and_today() {
        let tmp = TempDir::new().unwrap();
        let store = RepoConfigStore::new(tmp.path().join("github-repo.toml"));

        let config = store.load();
        assert_eq!(config.branch, "main");
        assert_eq!(config.owner, "");
        assert_eq!(config.path_prefix.len(), "YYYY/MM/DD".len());
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = RepoConfigStore::new(tmp.path().join("nested/dir/github-repo.toml"));

        store.save(&configured());
        assert_eq!(store.load(), configured());
    }

    #[test]
    fn load_merges_sparse_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("github-repo.toml");
        fs::write(&path, "owner = \"octocat\"\npathPrefix = \"pics\"\n").unwrap();

        let config = RepoConfigStore::new(&path).load();
        assert_eq!(config.owner, "octocat");
        assert_eq!(config.branch, "main");
        assert_eq!(config.path_prefix, "pics");
    }

    #[test]
    fn camel_case_prefix_merges_over_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("github-repo.toml");
        fs::write(&path, "owner = \"octocat\"\npathPrefix = \"pics\"\n").unwrap();

        let config = RepoConfigStore::new(&path).try_load().unwrap().unwrap();
        assert_eq!(config.owner, "octocat");
        assert_eq!(config.path_prefix, "pics");
    }

    #[test]
    fn snake_case_prefix_wins_over_camel_case() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("github-repo.toml");
        fs::write(
            &path,
            "owner = \"octocat\"\npathPrefix = \"old\"\npath_prefix = \"new\"\n",
        )
        .unwrap();

        let config = RepoConfigStore::new(&path).try_load().unwrap().unwrap();
        assert_eq!(config.path_prefix, "new");
    }

    #[test]
    fn blank_prefix_becomes_today() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("github-repo.toml");
        fs::write(&path, "owner = \"octocat\"\npath_prefix = \"  \"\n").unwrap();

        assert_eq!(RepoConfigStore::new(&path).load().path_prefix, current_date_path());
    }

    #[test]
    fn corrupt_record_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("github-repo.toml");
        fs::write(&path, "owner = [[[").unwrap();

        let store = RepoConfigStore::new(&path);
        assert!(matches!(store.try_load(), Err(StoreError::TomlDe(_))));
        assert_eq!(store.load().owner, "");
    }

    #[test]
    fn save_failure_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "").unwrap();
        // Parent "directory" is a regular file.
        let store = RepoConfigStore::new(blocker.join("github-repo.toml"));

        store.save(&configured());
        assert!(store.try_save(&configured()).is_err());
    }
}
