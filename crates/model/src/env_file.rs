use std::path::{Path, PathBuf};

use anyhow::Context;
use log::debug;

/// A flat `KEY=value` file, such as `.env`, that can have single keys rewritten in place.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets `key` to `value`. Every other line is written back untouched, and the
    /// key is appended when the file does not contain it yet.
    pub async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let existing = match tokio::fs::read_to_string(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Unable to read {}", self.path.display()))
            }
        };

        let contents = replace_key(&existing, key, value);

        tokio::fs::write(&self.path, contents)
            .await
            .with_context(|| format!("Unable to write {}", self.path.display()))?;

        debug!("Wrote {key} to {}", self.path.display());

        Ok(())
    }
}

fn replace_key(existing: &str, key: &str, value: &str) -> String {
    let mut found = false;
    let mut out = String::with_capacity(existing.len() + key.len() + value.len() + 2);

    for line in existing.split_inclusive('\n') {
        if line_has_key(line, key) {
            found = true;
            out.push_str(&format!("{key}={value}\n"));
        } else {
            out.push_str(line);
        }
    }

    if !found {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{key}={value}\n"));
    }

    out
}

fn line_has_key(line: &str, key: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line);

    line.strip_prefix(key)
        .map_or(false, |rest| rest.trim_start().starts_with('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_only_the_key() {
        let input = "BOT_TOKEN=abc\n# comment\nTWITCH_ACCESS_TOKEN=old\nTWITCH_ACCESS_TOKEN_EXTRA=keep\n";

        assert_eq!(
            replace_key(input, "TWITCH_ACCESS_TOKEN", "new"),
            "BOT_TOKEN=abc\n# comment\nTWITCH_ACCESS_TOKEN=new\nTWITCH_ACCESS_TOKEN_EXTRA=keep\n"
        );
    }

    #[test]
    fn appends_missing_key() {
        assert_eq!(replace_key("A=1", "B", "2"), "A=1\nB=2\n");
        assert_eq!(replace_key("", "B", "2"), "B=2\n");
    }

    #[tokio::test]
    async fn set_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "TWITCH_CLIENT_ID=id\nexport TWITCH_ACCESS_TOKEN = stale\n").unwrap();

        let file = EnvFile::new(&path);
        file.set("TWITCH_ACCESS_TOKEN", "fresh").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "TWITCH_CLIENT_ID=id\nTWITCH_ACCESS_TOKEN=fresh\n"
        );
    }

    #[tokio::test]
    async fn set_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = EnvFile::new(dir.path().join(".env"));

        file.set("TWITCH_ACCESS_TOKEN", "fresh").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            "TWITCH_ACCESS_TOKEN=fresh\n"
        );
    }
}
