use std::str::FromStr;

use transcript_core::{mask_secret, AppConfig, ConfigError, DestinationMode, NamingMode};

#[test]
fn destination_requires_both_credentials_and_folder() {
    let mut config = AppConfig::default();
    assert_eq!(config.destination(), DestinationMode::LocalFiles);

    config.credentials_path = "/keys/service.json".to_string();
    assert_eq!(config.destination(), DestinationMode::LocalFiles);

    config.folder_id = "folder-123".to_string();
    assert_eq!(config.destination(), DestinationMode::DocumentService);

    config.credentials_path.clear();
    assert_eq!(config.destination(), DestinationMode::LocalFiles);
}

#[test]
fn validate_rejects_missing_api_key() {
    let mut config = AppConfig::default();
    assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));

    config.speech_api_key = "   ".to_string();
    assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));

    config.speech_api_key = "dg-key".to_string();
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn defaults_match_first_run_expectations() {
    let config = AppConfig::default();
    assert_eq!(config.prefix, "Transcripcion");
    assert_eq!(config.naming_mode, NamingMode::Sequential);
    assert_eq!(config.output_directory, std::path::PathBuf::from("./output"));
}

#[test]
fn naming_mode_parses_known_values_only() {
    assert_eq!(NamingMode::from_str("original"), Ok(NamingMode::Original));
    assert_eq!(NamingMode::from_str("sequential"), Ok(NamingMode::Sequential));
    assert_eq!(
        NamingMode::from_str("random"),
        Err(ConfigError::InvalidNamingMode("random".to_string()))
    );
}

#[test]
fn secrets_are_masked_for_display() {
    assert_eq!(mask_secret(""), "");
    assert_eq!(mask_secret("short"), "***");
    assert_eq!(mask_secret("abcdefgh"), "***");
    assert_eq!(mask_secret("abcd1234wxyz"), "abcd***wxyz");
}
