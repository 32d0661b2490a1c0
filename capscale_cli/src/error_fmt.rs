//! Human-readable error descriptions, exit codes, and structured JSON errors.

/// Context attached to every failure while loading or validating the config file.
pub const CONFIG_CONTEXT: &str = "invalid configuration";

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use capscale_core::error::{BuildError, EngineError};

    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid engine configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or in a session `set` command.\nHow to fix: Correct the value and rerun."
        );
    }

    if let Some(EngineError::Source(src)) = err.downcast_ref::<EngineError>() {
        return format!(
            "What happened: The sensor did not deliver a reading ({src}).\nLikely causes: Sensor disconnected or acquisition buffer empty.\nHow to fix: Check the sensor connection and retry the command."
        );
    }

    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("session csv must have headers") {
        return "Invalid headers in session CSV. Expected 'real_weight_g,adc_raw,tare'.".to_string();
    }

    if lower.starts_with(CONFIG_CONTEXT) {
        return format!(
            "What happened: Configuration is invalid.\nDetails: {msg}\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("invalid csv row") || lower.contains("open session csv") {
        return format!(
            "What happened: The session CSV could not be replayed.\nDetails: {msg}\nHow to fix: Check the file path and the offending row."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// 2 for configuration problems, 1 for everything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use capscale_core::error::BuildError;
    if err.downcast_ref::<BuildError>().is_some() || err.to_string().starts_with(CONFIG_CONTEXT) {
        return 2;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use capscale_core::error::{BuildError, EngineError};
    if err.downcast_ref::<BuildError>().is_some() || err.to_string().starts_with(CONFIG_CONTEXT) {
        "ConfigError"
    } else if err.downcast_ref::<EngineError>().is_some() {
        "SourceError"
    } else {
        "Error"
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
