//! Argument parsers shared by the commands.

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid parameter format: '{}' (expected key=value)",
            s
        ));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// A held gate on one voice of a `voices` module.
#[derive(Debug, Clone, PartialEq)]
pub struct GateSpan {
    /// Target module id.
    pub module: String,
    /// Voice index.
    pub voice: usize,
    /// Gate-on time in seconds.
    pub on: f32,
    /// Gate-off time in seconds; `None` holds until the end.
    pub off: Option<f32>,
}

/// Parse `module:voice@on[-off]` (times in seconds).
pub fn parse_gate(s: &str) -> Result<GateSpan, String> {
    let (target, times) = s
        .split_once('@')
        .ok_or_else(|| format!("Invalid gate '{s}' (expected module:voice@on-off)"))?;
    let (module, voice) = target
        .split_once(':')
        .ok_or_else(|| format!("Invalid gate target '{target}' (expected module:voice)"))?;
    if module.is_empty() {
        return Err(format!("Invalid gate '{s}': empty module id"));
    }
    let voice: usize = voice
        .parse()
        .map_err(|_| format!("Invalid voice index '{voice}'"))?;

    let (on, off) = match times.split_once('-') {
        Some((on, off)) => (on, Some(off)),
        None => (times, None),
    };
    let on = parse_seconds(on)?;
    let off = off.map(parse_seconds).transpose()?;
    if let Some(off) = off
        && off <= on
    {
        return Err(format!("Gate off time {off} must be after on time {on}"));
    }

    Ok(GateSpan {
        module: module.to_string(),
        voice,
        on,
        off,
    })
}

fn parse_seconds(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid time '{s}' (expected seconds)"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("Invalid time '{s}' (must be >= 0)"));
    }
    Ok(value)
}

/// Split `module.param` into its parts.
pub fn split_param_target(s: &str) -> Result<(&str, &str), String> {
    match s.split_once('.') {
        Some((module, param)) if !module.is_empty() && !param.is_empty() => Ok((module, param)),
        _ => Err(format!("Invalid parameter target '{s}' (expected module.param)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_val() {
        assert_eq!(
            parse_key_val("osc.frequency=220").unwrap(),
            ("osc.frequency".to_string(), "220".to_string())
        );
        assert_eq!(
            parse_key_val("seq.pattern=a=b").unwrap(),
            ("seq.pattern".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("frequency").is_err());
    }

    #[test]
    fn gate_with_off_time() {
        let gate = parse_gate("voices:2@0.25-1.5").unwrap();
        assert_eq!(
            gate,
            GateSpan {
                module: "voices".into(),
                voice: 2,
                on: 0.25,
                off: Some(1.5),
            }
        );
    }

    #[test]
    fn gate_held_to_end() {
        let gate = parse_gate("v:0@0").unwrap();
        assert_eq!(gate.on, 0.0);
        assert_eq!(gate.off, None);
    }

    #[test]
    fn bad_gates() {
        assert!(parse_gate("voices@0-1").is_err());
        assert!(parse_gate("voices:x@0-1").is_err());
        assert!(parse_gate(":0@0-1").is_err());
        assert!(parse_gate("voices:0").is_err());
        assert!(parse_gate("voices:0@1-0.5").is_err());
        assert!(parse_gate("voices:0@-1").is_err());
    }

    #[test]
    fn param_target() {
        assert_eq!(split_param_target("osc.frequency").unwrap(), ("osc", "frequency"));
        assert!(split_param_target("osc").is_err());
        assert!(split_param_target(".frequency").is_err());
    }
}
