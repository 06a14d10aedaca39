//! File loading tests for rtb-hooks-config.
// crates/rtb-hooks-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Tests
// Description: Tests for reading configuration files from disk.
// Purpose: Ensure size, encoding, and parse failures fail closed.
// =============================================================================

use std::io::Write;

use rtb_hooks_config::ConfigError;
use rtb_hooks_config::RtbHooksConfig;
use tempfile::NamedTempFile;

mod common;

use common::assert_invalid;

type TestResult = Result<(), String>;

/// Writes bytes to a temporary config file.
fn write_config(bytes: &[u8]) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(bytes).map_err(|err| err.to_string())?;
    file.flush().map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_reads_valid_file() -> TestResult {
    let file = write_config(
        b"[hooks]\nenabled = true\n\n[hooks.modules.acme.foobar]\nenabled = true\n",
    )?;
    let config = RtbHooksConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if !config.hooks.enabled || !config.hooks.module_enabled("acme.foobar") {
        return Err("loaded config lost hook settings".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut content = b"# padding\n".to_vec();
    content.resize(1024 * 1024 + 1, b'#');
    let file = write_config(&content)?;
    assert_invalid(RtbHooksConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8() -> TestResult {
    let file = write_config(&[0xff, 0xfe, 0x00])?;
    assert_invalid(RtbHooksConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_reports_parse_errors() -> TestResult {
    let file = write_config(b"[hooks\nenabled = true\n")?;
    match RtbHooksConfig::load(Some(file.path())) {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
        Ok(_) => Err("malformed toml should not load".to_string()),
    }
}

#[test]
fn load_reports_missing_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    match RtbHooksConfig::load(Some(&dir.path().join("absent.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
        Ok(_) => Err("missing file should not load".to_string()),
    }
}

#[test]
fn load_runs_validation() -> TestResult {
    let file = write_config(b"[logging]\nsink = \"file\"\n")?;
    assert_invalid(RtbHooksConfig::load(Some(file.path())), "logging.path is required")
}

#[test]
fn load_rejects_long_path_component() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("a".repeat(256));
    assert_invalid(RtbHooksConfig::load(Some(&path)), "config path component too long")
}
