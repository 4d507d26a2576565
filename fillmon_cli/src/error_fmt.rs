//! Human-readable error descriptions and structured JSON error formatting.

use fillmon_core::error::{BuildError, BusyReason, DecodeError, SessionError};
use fillmon_sim::error::SimError;
use serde_json::json;

fn find<'a, E: std::error::Error + 'static>(err: &'a eyre::Report) -> Option<&'a E> {
    err.chain().find_map(|e| e.downcast_ref::<E>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(se) = find::<SessionError>(err) {
        return match se {
            SessionError::Busy {
                tank,
                reason: BusyReason::AlreadyFilling,
            } => format!(
                "What happened: {tank} already has a session in progress.\nLikely causes: A previous start was never stopped.\nHow to fix: Stop the running session on {tank} before starting a new order."
            ),
            SessionError::Busy {
                tank,
                reason: BusyReason::PartnerFilling(partner),
            } => format!(
                "What happened: {tank} cannot start while {partner} is filling.\nLikely causes: {tank} and {partner} share one filling head.\nHow to fix: Stop {partner} first, or check line.exclusive_pairs in the config."
            ),
            SessionError::NotFilling(tank) => format!(
                "What happened: {tank} has no session in progress.\nLikely causes: The session was already stopped or never started.\nHow to fix: Start an order on {tank} first."
            ),
            SessionError::UnknownTank(tank) => format!(
                "What happened: {tank} is not monitored by this line.\nLikely causes: Typo in --tank or a tank missing from line.tanks.\nHow to fix: Use one of the tanks listed by `fillmon self-check`, or add it to line.tanks."
            ),
            SessionError::InvalidOrder(msg) => format!(
                "What happened: The process order was rejected ({msg}).\nLikely causes: Empty identifiers, or a non-positive target or rate.\nHow to fix: Fill in of, legajo, orden_envasado and material, and give a positive target and rate."
            ),
        };
    }

    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::InvalidLayout(msg) => format!(
                "What happened: Invalid line layout ({msg}).\nLikely causes: Duplicate tanks, a tank paired with itself, or a pair naming an unknown tank.\nHow to fix: Edit [line] in the config, then rerun."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/fillmon.toml for a sample."
            ),
        };
    }

    if let Some(de) = find::<DecodeError>(err) {
        return format!(
            "What happened: {de}.\nLikely causes: A message that does not follow <prefix>/<tank>/<kind> with a JSON payload.\nHow to fix: Check line.topic_prefix and the producer's payload format."
        );
    }

    if let Some(se) = find::<SimError>(err) {
        return format!(
            "What happened: The simulated line could not be set up ({se}).\nLikely causes: A bad --tank-kg value or tolerance.ratio.\nHow to fix: Pass a finite, non-negative inventory and a ratio in (0, 0.5]."
        );
    }

    if let Some(te) = find::<toml::de::Error>(err) {
        return format!(
            "What happened: A TOML file could not be parsed.\nLikely causes: Syntax error or a value of the wrong type.\nHow to fix: Correct the file and rerun. Parser said: {}",
            te.message()
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") {
        let cause = err
            .chain()
            .last()
            .map(ToString::to_string)
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid ({cause}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file."
        );
    }

    // Capture CSV header special-case
    if lower.contains("capture csv must have headers") {
        return "Invalid headers in capture CSV. Expected 't_ms,weight_kg'.".to_string();
    }

    if lower.contains("autonomy") && lower.contains("order") {
        return format!(
            "What happened: The order file does not declare one autonomy mode ({msg}).\nLikely causes: Missing or mixed count and mass fields.\nHow to fix: Give target_quantity + gpm, or target_quantity_kg + packaging_standard_kg_min."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes for session errors; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match find::<SessionError>(err) {
        Some(SessionError::Busy { .. }) => 2,
        Some(SessionError::NotFilling(_)) => 3,
        Some(SessionError::UnknownTank(_)) => 4,
        Some(SessionError::InvalidOrder(_)) => 5,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(se) = find::<SessionError>(err) {
        return match se {
            SessionError::Busy { .. } => "Busy",
            SessionError::NotFilling(_) => "NotFilling",
            SessionError::UnknownTank(_) => "UnknownTank",
            SessionError::InvalidOrder(_) => "InvalidOrder",
        };
    }
    if find::<BuildError>(err).is_some() {
        return "InvalidConfig";
    }
    if find::<DecodeError>(err).is_some() {
        return "Malformed";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let reason = reason_name(err);
    match find::<SessionError>(err) {
        Some(SessionError::Busy {
            tank,
            reason: BusyReason::PartnerFilling(partner),
        }) => json!({
            "reason": reason,
            "details": { "tank": tank, "partner": partner },
            "message": humanize(err),
        }),
        Some(
            SessionError::Busy { tank, .. }
            | SessionError::NotFilling(tank)
            | SessionError::UnknownTank(tank),
        ) => json!({
            "reason": reason,
            "details": { "tank": tank },
            "message": humanize(err),
        }),
        _ => json!({ "reason": reason, "message": humanize(err) }),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fillmon_core::TankId;
    use rstest::rstest;

    #[rstest]
    #[case(SessionError::Busy { tank: TankId(4), reason: BusyReason::PartnerFilling(TankId(3)) }, 2, "Busy")]
    #[case(SessionError::NotFilling(TankId(5)), 3, "NotFilling")]
    #[case(SessionError::UnknownTank(TankId(9)), 4, "UnknownTank")]
    #[case(SessionError::InvalidOrder("of is empty".into()), 5, "InvalidOrder")]
    fn session_errors_map_to_codes(
        #[case] e: SessionError,
        #[case] code: i32,
        #[case] reason: &str,
    ) {
        let report = eyre::Report::new(e);
        assert_eq!(exit_code_for_error(&report), code);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], reason);
        assert!(v["message"].as_str().unwrap().starts_with("What happened"));
    }

    #[test]
    fn wrapped_session_error_is_still_found() {
        let report = eyre::Report::new(SessionError::NotFilling(TankId(6))).wrap_err("stop tank");
        assert_eq!(exit_code_for_error(&report), 3);
        assert!(humanize(&report).contains("TK6 has no session"));
    }

    #[test]
    fn partner_is_reported_in_details() {
        let report = eyre::Report::new(SessionError::Busy {
            tank: TankId(4),
            reason: BusyReason::PartnerFilling(TankId(3)),
        });
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["details"]["partner"], 3);
        assert!(humanize(&report).contains("TK4 cannot start while TK3 is filling"));
    }

    #[test]
    fn unknown_errors_fall_back_to_generic_text() {
        let report = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&report), 1);
        assert!(humanize(&report).starts_with("Something went wrong."));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], "Error");
    }
}
