//! Environment overrides, isolated in their own test binary since they mutate process env

use std::env;
use std::fs;

use tempfile::TempDir;

use tpacalc::config::Settings;
use tpacalc::domain::MultiFeaturePolicy;

#[test]
fn given_env_and_file_when_loading_then_env_wins() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tpacalc.toml");
    fs::write(
        &path,
        "storage_api_url = \"http://from-file:7111\"\nrequest_timeout_secs = 5\n",
    )
    .unwrap();
    env::set_var("TPACALC_STORAGE_API_URL", "http://from-env:7111");
    env::set_var("TPACALC_PROJECTION__MULTI_FEATURE_POLICY", "reject");

    // Act
    let result = Settings::load(Some(&path));
    env::remove_var("TPACALC_STORAGE_API_URL");
    env::remove_var("TPACALC_PROJECTION__MULTI_FEATURE_POLICY");
    let settings = result.unwrap();

    // Assert
    assert_eq!(settings.storage_api_url, "http://from-env:7111");
    assert_eq!(settings.request_timeout_secs, 5);
    assert_eq!(
        settings.projection.multi_feature_policy,
        MultiFeaturePolicy::Reject
    );
}
