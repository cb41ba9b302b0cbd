//! Tests for layered settings loading from explicit config files

use std::fs;

use rstest::rstest;
use tempfile::TempDir;

use tpacalc::application::ApplicationError;
use tpacalc::config::Settings;
use tpacalc::domain::projection::UTM_ZONE_10N;
use tpacalc::domain::MultiFeaturePolicy;

#[test]
fn given_partial_config_file_when_loading_then_overrides_only_given_fields() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tpacalc.toml");
    fs::write(
        &path,
        r#"
db_api_url = "http://db.internal:5055"
confidence_level = 0.9

[projection]
multi_feature_policy = "reject"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(&path)).unwrap();

    // Assert
    assert_eq!(settings.db_api_url, "http://db.internal:5055");
    assert_eq!(settings.storage_api_url, "http://localhost:7111");
    assert_eq!(settings.confidence_level, 0.9);
    assert_eq!(settings.projection.target, UTM_ZONE_10N);
    assert_eq!(
        settings.projection.multi_feature_policy,
        MultiFeaturePolicy::Reject
    );
}

#[test]
fn given_missing_explicit_file_when_loading_then_config_error() {
    let temp = TempDir::new().unwrap();
    let err = Settings::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ApplicationError::Config { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[rstest]
#[case("confidence_level = 1.0")]
#[case("confidence_level = 0")]
#[case("storage_api_url = \"\"")]
#[case("confidence_level = \"high\"")]
#[case("[projection]\nmulti_feature_policy = \"all\"")]
fn given_invalid_config_when_loading_then_config_error(#[case] content: &str) {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tpacalc.toml");
    fs::write(&path, content).unwrap();

    // Act
    let result = Settings::load(Some(&path));

    // Assert
    assert!(
        matches!(result, Err(ApplicationError::Config { .. })),
        "{:?}",
        result
    );
}

#[test]
fn given_loaded_settings_when_rendering_toml_then_reloads_identically() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tpacalc.toml");
    fs::write(&path, "request_timeout_secs = 5\n").unwrap();
    let settings = Settings::load(Some(&path)).unwrap();

    let rendered = temp.path().join("rendered.toml");
    fs::write(&rendered, settings.to_toml().unwrap()).unwrap();
    let reloaded = Settings::load(Some(&rendered)).unwrap();

    assert_eq!(reloaded, settings);
    assert_eq!(reloaded.request_timeout_secs, 5);
}
