// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PATH: &str = "DIGEST_COMMUNITIES_PATH";

/// Load the community list from an explicit path. Supports TOML or JSON formats.
pub fn load_communities_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading communities from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_communities(&content, ext.as_str())
}

/// Resolve the community list file:
/// 1) `explicit` (the value of $DIGEST_COMMUNITIES_PATH, if set)
/// 2) config/communities.toml
/// 3) config/communities.json
///
/// Returns `Ok(None)` when no file applies.
pub fn load_communities_default(explicit: Option<&str>) -> Result<Option<Vec<String>>> {
    if let Some(p) = explicit {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_communities_from(&pb).map(Some);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path {p}"));
        }
    }
    let toml_p = PathBuf::from("config/communities.toml");
    if toml_p.exists() {
        return load_communities_from(&toml_p).map(Some);
    }
    let json_p = PathBuf::from("config/communities.json");
    if json_p.exists() {
        return load_communities_from(&json_p).map(Some);
    }
    Ok(None)
}

/// Comma-separated list, as found in `SUBREDDITS`.
pub fn parse_community_csv(s: &str) -> Vec<String> {
    clean_list(s.split(',').map(str::to_string))
}

/// Both file formats carry the same shape: a bare list, or a table with a
/// `communities` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommunityFile {
    Table { communities: Vec<String> },
    List(Vec<String>),
}

impl CommunityFile {
    fn into_list(self) -> Vec<String> {
        match self {
            CommunityFile::Table { communities } | CommunityFile::List(communities) => communities,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    /// Extension first; otherwise a leading `[` or `{` means JSON.
    fn detect(ext: &str, content: &str) -> Self {
        match ext {
            "json" => FileFormat::Json,
            "toml" => FileFormat::Toml,
            _ if content.trim_start().starts_with(['[', '{']) => FileFormat::Json,
            _ => FileFormat::Toml,
        }
    }
}

fn parse_communities(content: &str, ext: &str) -> Result<Vec<String>> {
    let file: CommunityFile = match FileFormat::detect(ext, content) {
        FileFormat::Json => serde_json::from_str(content).context("communities file is not valid JSON")?,
        FileFormat::Toml => toml::from_str(content).context("communities file is not valid TOML")?,
    };
    let list = clean_list(file.into_list());
    if list.is_empty() {
        return Err(anyhow!("communities file lists no communities"));
    }
    Ok(list)
}

/// Trim, strip an `r/` prefix, drop empties and case-insensitive repeats.
/// Keeps first-seen order since it decides digest ordering.
fn clean_list<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        let t = t
            .strip_prefix("/r/")
            .or_else(|| t.strip_prefix("r/"))
            .unwrap_or(t)
            .trim_matches('/');
        if t.is_empty() {
            continue;
        }
        if seen.insert(t.to_ascii_lowercase()) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_trim_and_formats_work() {
        let toml = r#"communities = [" rust ", "", "r/golang", "Rust"]"#;
        let json = r#"["python", "  /r/programming/  ", ""]"#;
        assert_eq!(parse_communities(toml, "toml").unwrap(), vec!["rust", "golang"]);
        assert_eq!(
            parse_communities(json, "json").unwrap(),
            vec!["python", "programming"]
        );
    }

    #[test]
    fn either_shape_in_either_format() {
        let json_table = r#"{"communities": ["rust"]}"#;
        assert_eq!(parse_communities(json_table, "json").unwrap(), vec!["rust"]);
        // no extension: sniffed from content
        assert_eq!(parse_communities(r#" ["zig"]"#, "").unwrap(), vec!["zig"]);
        assert_eq!(
            parse_communities(r#"communities = ["nix"]"#, "").unwrap(),
            vec!["nix"]
        );
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = parse_communities(r#"communities = ["", "r/"]"#, "toml").unwrap_err();
        assert!(err.to_string().contains("no communities"), "{err}");
    }

    #[test]
    fn csv_keeps_order() {
        assert_eq!(
            parse_community_csv("technology, python ,,programming"),
            vec!["technology", "python", "programming"]
        );
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(parse_communities("not a list", "txt").is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        assert!(load_communities_default(Some("/definitely/not/here.toml")).is_err());
    }
}
