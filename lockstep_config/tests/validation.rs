use lockstep_config::{ScalerKind, WaveformKind, load_toml};
use rstest::rstest;

#[test]
fn empty_config_uses_defaults_and_validates() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults validate");
    assert_eq!(cfg.engine.tick_hz, 100);
    assert_eq!(cfg.oscillator.waveform, WaveformKind::Sine);
    assert_eq!(cfg.scaler.kind, ScalerKind::None);
    assert!(cfg.smoother.enabled);
}

#[test]
fn full_config_round_trips() {
    let toml = r#"
[engine]
tick_hz = 200
run_s = 5.0

[oscillator]
waveform = "triangle"
period_s = 0.5
shape_param = 0.3
randomness = 0.2

[smoother]
enabled = true

[smoother.window]
samples = 16

[scaler]
kind = "robust"
calibrate_s = 1.5
span = 0.95

[threshold]
enabled = true
value = 0.6
hysteresis = 0.1

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("validate");
    assert_eq!(cfg.engine.tick_hz, 200);
    assert_eq!(cfg.oscillator.waveform, WaveformKind::Triangle);
    assert_eq!(cfg.smoother.window.samples, Some(16));
    assert_eq!(cfg.scaler.kind, ScalerKind::Robust);
    assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
}

#[rstest]
#[case("[engine]\ntick_hz = 0\n", "engine.tick_hz")]
#[case("[oscillator]\nperiod_s = 0.0\n", "oscillator.period_s")]
#[case("[oscillator]\nperiod_s = -1.0\n", "oscillator.period_s")]
#[case("[oscillator]\nrandomness = 1.5\n", "oscillator.randomness")]
#[case("[oscillator]\nshape_param = -0.1\n", "oscillator.shape_param")]
#[case("[sensor]\nperiod_s = 0.0\n", "sensor.period_s")]
#[case("[sensor]\nnoise = -0.1\n", "sensor.noise")]
#[case("[smoother.window]\nsamples = 0\n", "smoother.window.samples")]
#[case("[smoother.window]\nseconds = 0.0\n", "smoother.window.seconds")]
#[case("[scaler]\nspan = 0.0\n", "scaler.span")]
#[case("[scaler]\nspan = 1.5\n", "scaler.span")]
#[case("[threshold]\nhysteresis = -0.5\n", "threshold.hysteresis")]
fn rejects_invalid_values(#[case] toml: &str, #[case] expected_msg: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(expected_msg),
        "error `{err}` should mention {expected_msg}"
    );
}

#[test]
fn rejects_window_with_both_fields() {
    let toml = "[smoother.window]\nsamples = 8\nseconds = 0.5\n";
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject ambiguous window");
    assert!(format!("{err}").contains("not both"));
}

#[test]
fn unknown_waveform_fails_to_parse() {
    let toml = "[oscillator]\nwaveform = \"sawtooth\"\n";
    assert!(load_toml(toml).is_err());
}
