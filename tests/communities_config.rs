// tests/communities_config.rs
use std::collections::HashMap;
use std::{env, fs};

use subreddit_digest::ingest::config::{load_communities_default, load_communities_from};
use subreddit_digest::AppConfig;

fn dry_run_lookup(extra: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
    let mut map: HashMap<String, String> = HashMap::from([
        ("LLM_TEST_MODE".to_string(), "mock".to_string()),
        ("DIGEST_DRY_RUN".to_string(), "yes".to_string()),
    ]);
    for (k, v) in extra {
        map.insert(k.to_string(), v.clone());
    }
    move |k| map.get(k).cloned()
}

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("communities.toml");
    fs::write(
        &p_toml,
        r#"
communities = [" rust ", "", "r/golang", "RUST"]
"#,
    )
    .unwrap();
    let v = load_communities_from(&p_toml).unwrap();
    assert_eq!(v, vec!["rust".to_string(), "golang".to_string()]);

    let p_json = dir.path().join("communities.json");
    fs::write(&p_json, r#"["selfhosted"," /r/homelab/ ", ""]"#).unwrap();
    let vj = load_communities_from(&p_json).unwrap();
    assert_eq!(vj, vec!["selfhosted".to_string(), "homelab".to_string()]);
}

#[serial_test::serial]
#[test]
fn default_uses_explicit_path_then_fallbacks() {
    // isolate cwd so the repo's own config/ is never read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // 1) nothing on disk
    assert!(load_communities_default(None).unwrap().is_none());
    let cfg = AppConfig::from_lookup(dry_run_lookup(&[])).unwrap();
    assert_eq!(cfg.fetch.communities, vec!["python", "technology", "programming"]);

    // 2) JSON fallback in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("communities.json"), r#"["linux"]"#).unwrap();
    assert_eq!(load_communities_default(None).unwrap().unwrap(), vec!["linux"]);

    // 3) TOML wins over JSON
    fs::write(
        cfg_dir.join("communities.toml"),
        r#"communities = ["rust", "golang"]"#,
    )
    .unwrap();
    let cfg = AppConfig::from_lookup(dry_run_lookup(&[])).unwrap();
    assert_eq!(cfg.fetch.communities, vec!["rust", "golang"]);

    // 4) explicit path wins over both
    let p_env = tmp.path().join("mine.json");
    fs::write(&p_env, r#"["zig"]"#).unwrap();
    let cfg = AppConfig::from_lookup(dry_run_lookup(&[(
        "DIGEST_COMMUNITIES_PATH",
        p_env.display().to_string(),
    )]))
    .unwrap();
    assert_eq!(cfg.fetch.communities, vec!["zig"]);

    // 5) SUBREDDITS wins over everything
    let cfg = AppConfig::from_lookup(dry_run_lookup(&[
        ("DIGEST_COMMUNITIES_PATH", p_env.display().to_string()),
        ("SUBREDDITS", "r/news, worldnews".to_string()),
    ]))
    .unwrap();
    assert_eq!(cfg.fetch.communities, vec!["news", "worldnews"]);

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn empty_community_file_is_rejected() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("communities.toml"), r#"communities = ["", " "]"#).unwrap();
    let err = AppConfig::from_lookup(dry_run_lookup(&[])).unwrap_err();
    assert!(err.to_string().contains("no communities"), "{err}");

    env::set_current_dir(&old).unwrap();
}
