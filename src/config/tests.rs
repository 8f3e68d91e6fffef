#![allow(clippy::unwrap_used, clippy::expect_used)]

use serial_test::serial;

use super::*;

fn set_config_env(val: &str) {
    // SAFETY: test-only env mutation; #[serial] prevents races.
    unsafe { std::env::set_var("AUGSCRIPT_CONFIG", val) };
}

fn clear_config_env() {
    unsafe { std::env::remove_var("AUGSCRIPT_CONFIG") };
}

#[test]
fn parses_all_fields() {
    let cfg: UserConfig = toml::from_str(
        r#"
pretty = true
regexp = 12
noseq = true
lens_dirs = ["/usr/local/share/lenses"]
"#,
    )
    .unwrap();
    assert_eq!(cfg.pretty, Some(true));
    assert_eq!(cfg.regexp, Some(12));
    assert_eq!(cfg.noseq, Some(true));
    assert_eq!(
        cfg.lens_dirs,
        Some(vec!["/usr/local/share/lenses".to_string()])
    );
}

#[test]
fn empty_file_means_all_defaults() {
    let cfg: UserConfig = toml::from_str("").unwrap();
    assert_eq!(cfg, UserConfig::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let result: Result<UserConfig, _> = toml::from_str("colour = true");
    assert!(result.is_err());
}

#[test]
fn command_line_wins_over_config() {
    let mut opts = Options {
        regexp: Some(16),
        ..Options::default()
    };
    opts.apply_user_config(&UserConfig {
        pretty: Some(true),
        regexp: Some(4),
        noseq: None,
        lens_dirs: None,
    });
    assert!(opts.pretty);
    assert_eq!(opts.regexp, Some(16));
    assert!(!opts.noseq);
}

#[test]
fn config_fills_unset_knobs() {
    let mut opts = Options::default();
    opts.apply_user_config(&UserConfig {
        pretty: None,
        regexp: Some(8),
        noseq: Some(true),
        lens_dirs: Some(vec!["/opt/lenses".to_string()]),
    });
    assert!(!opts.pretty);
    assert_eq!(opts.regexp, Some(8));
    assert!(opts.noseq);
    assert_eq!(opts.lens_dirs, vec!["/opt/lenses".to_string()]);
}

#[test]
fn seq_star_honours_noseq() {
    let opts = Options::default();
    assert_eq!(opts.seq_star(), "seq::*");
    let opts = Options {
        noseq: true,
        ..Options::default()
    };
    assert_eq!(opts.seq_star(), "*");
}

#[test]
#[serial]
fn env_var_overrides_the_config_path() {
    set_config_env("/custom/augscript.toml");
    let result = user_config_path();
    clear_config_env();
    assert_eq!(result, Some(PathBuf::from("/custom/augscript.toml")));
}

#[test]
#[serial]
fn empty_env_var_falls_back_to_platform_dir() {
    set_config_env("");
    let result = user_config_path();
    clear_config_env();
    assert_eq!(result, dirs::config_dir().map(|d| d.join("augscript/config.toml")));
}

#[test]
fn missing_file_is_not_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = try_load_user_config(&dir.path().join("nope.toml")).unwrap();
    assert_eq!(result, None);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "pretty = maybe").unwrap();
    let err = try_load_user_config(&path).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
fn valid_file_loads() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "regexp = 10").unwrap();
    let cfg = try_load_user_config(&path).unwrap().unwrap();
    assert_eq!(cfg.regexp, Some(10));
}
