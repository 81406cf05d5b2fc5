//! Log file housekeeping and build information.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

/// Maximum number of log files to retain.
pub const MAX_LOG_FILES: usize = 10;

/// Prefix of the rolling log files (`pos.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "pos";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub platform: &'static str,
    pub arch: &'static str,
}

pub fn about_info() -> AboutInfo {
    AboutInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("BUILD_GIT_SHA").unwrap_or("unknown"),
        platform: std::env::consts::OS,
        arch: std::env::consts::ARCH,
    }
}

fn is_log_file(name: &str) -> bool {
    name == LOG_FILE_PREFIX || name.starts_with(&format!("{LOG_FILE_PREFIX}."))
}

/// Delete all but the newest `keep` log files in `log_dir`.
pub fn prune_old_logs(log_dir: &Path, keep: usize) {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut log_files: Vec<(PathBuf, SystemTime)> = entries
        .flatten()
        .filter(|entry| {
            entry.path().is_file()
                && entry.file_name().to_str().map(is_log_file).unwrap_or(false)
        })
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (entry.path(), modified)
        })
        .collect();

    // Newest first; ties fall back to the (date-stamped) name.
    log_files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

    for (path, _) in log_files.iter().skip(keep) {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to prune log file {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tokosheet-logs-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("create dir");
        dir
    }

    #[test]
    fn keeps_newest_log_files_and_ignores_others() {
        let dir = scratch_dir();
        for day in 1..=5 {
            fs::write(dir.join(format!("pos.2025-03-0{day}")), b"x").expect("write");
        }
        fs::write(dir.join("tokosheet.db"), b"db").expect("write");

        prune_old_logs(&dir, 2);

        let mut left: Vec<String> = fs::read_dir(&dir)
            .expect("read")
            .flatten()
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        left.sort();
        assert_eq!(left.len(), 3);
        assert!(left.contains(&"tokosheet.db".to_string()));
        assert_eq!(left.iter().filter(|n| n.starts_with("pos.")).count(), 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_is_ignored() {
        prune_old_logs(Path::new("/nonexistent/tokosheet/logs"), MAX_LOG_FILES);
    }

    #[test]
    fn about_reports_package_version() {
        let about = about_info();
        assert_eq!(about.version, env!("CARGO_PKG_VERSION"));
        assert!(!about.git_sha.is_empty());
    }
}
