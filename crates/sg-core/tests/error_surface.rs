use sg_core::errors::{ErrorInfo, SgError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("num_samples", 0)
        .with_context("reason", "example")
}

#[test]
fn config_error_surface() {
    let err = SgError::Config(sample_info("num-samples-too-small", "need two samples"));
    assert_eq!(err.info().code, "num-samples-too-small");
    assert_eq!(err.info().context["num_samples"], "0");
    assert!(err.is_config());
    assert!(!err.is_convergence());
}

#[test]
fn convergence_error_surface() {
    let err = SgError::Convergence(sample_info("refine-no-fixed-point", "gave up"));
    assert!(err.is_convergence());
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = SgError::Analysis(
        ErrorInfo::new("space-too-large", "too many samples")
            .with_context("size", 42)
            .with_hint("shorten the samples"),
    );
    let text = err.to_string();
    assert!(text.starts_with("analysis error: too many samples (code: space-too-large)"));
    assert!(text.contains("size=42"));
    assert!(text.ends_with("hint: shorten the samples"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = SgError::config("length-zero", "sample length must be positive", "length", 0);
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "Config");
    assert_eq!(json["detail"]["code"], "length-zero");

    let decoded: SgError = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, err);
}
