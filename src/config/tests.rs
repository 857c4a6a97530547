use super::*;
use clap::Parser;

fn parse(args: &[&str]) -> AppConfig {
    let mut full = vec!["tutorcall"];
    full.extend_from_slice(args);
    AppConfig::parse_from(full)
}

fn validated(args: &[&str]) -> anyhow::Result<AppConfig> {
    let mut config = parse(args);
    config.validate()?;
    Ok(config)
}

#[test]
fn defaults_are_valid() {
    let config = validated(&[]).expect("defaults should validate");
    assert_eq!(config.frame_samples, DEFAULT_FRAME_SAMPLES);
    assert_eq!(config.detect_interval_ms, DEFAULT_DETECT_INTERVAL_MS);
    assert_eq!(config.speech_locale, DEFAULT_SPEECH_LOCALE);
    assert_eq!(config.speech_restart_backoff_ms, DEFAULT_RESTART_BACKOFF_MS);
}

#[test]
fn rejects_out_of_range_frame_samples() {
    assert!(validated(&["--frame-samples", "64"]).is_err());
    assert!(validated(&["--frame-samples", "100000"]).is_err());
}

#[test]
fn rejects_out_of_range_detect_interval() {
    assert!(validated(&["--detect-interval-ms", "5"]).is_err());
    assert!(validated(&["--detect-interval-ms", "60000"]).is_err());
}

#[test]
fn rejects_out_of_range_backoff() {
    assert!(validated(&["--speech-restart-backoff-ms", "10"]).is_err());
    assert!(validated(&["--speech-restart-backoff-ms", "90000"]).is_err());
}

#[test]
fn rejects_zero_restart_cap() {
    assert!(validated(&["--speech-max-restarts-per-min", "0"]).is_err());
}

#[test]
fn rejects_absurd_camera_dimensions() {
    assert!(validated(&["--camera-width", "2"]).is_err());
    assert!(validated(&["--camera-height", "9000"]).is_err());
}

#[test]
fn accepts_locale_with_region_suffix() {
    let config = validated(&["--speech-locale", "pt-BR"]).expect("pt-BR is valid");
    assert_eq!(config.speech_locale, "pt-BR");
}

#[test]
fn rejects_unknown_language_code() {
    assert!(validated(&["--speech-locale", "zz-ZZ"]).is_err());
}

#[test]
fn rejects_locale_with_metacharacters() {
    assert!(validated(&["--speech-locale", "en;rm"]).is_err());
    assert!(validated(&["--speech-locale", ""]).is_err());
}

#[test]
fn rejects_non_websocket_link_url() {
    assert!(validated(&["--link-url", "http://localhost:8080/ws"]).is_err());
    assert!(validated(&["--link-url", "not a url"]).is_err());
}

#[test]
fn accepts_and_normalizes_wss_url() {
    let config = validated(&["--link-url", "wss://tutor.example.com/ws"]).expect("wss is valid");
    let endpoint = config.link_endpoint().expect("parsed endpoint");
    assert_eq!(endpoint.scheme(), "wss");
    assert_eq!(endpoint.host_str(), Some("tutor.example.com"));
}

#[test]
fn session_tuning_maps_cli_fields() {
    let config = validated(&[
        "--speech-locale",
        "fr-FR",
        "--speech-restart-backoff-ms",
        "500",
        "--speech-max-restarts-per-min",
        "4",
        "--detect-interval-ms",
        "250",
        "--camera-width",
        "640",
        "--camera-height",
        "360",
    ])
    .expect("config is valid");
    let tuning = config.session_tuning();
    assert_eq!(tuning.recognizer.locale, "fr-FR");
    assert!(tuning.recognizer.continuous);
    assert!(tuning.recognizer.interim_results);
    assert_eq!(tuning.restart_backoff.as_millis(), 500);
    assert_eq!(tuning.max_restarts_per_min, 4);
    assert_eq!(tuning.detect_interval.as_millis(), 250);
    assert_eq!(tuning.camera.ideal_width, 640);
    assert_eq!(tuning.camera.ideal_height, 360);
}
