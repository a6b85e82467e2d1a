use crate::{CoreError, LaunchArgs};

use uuid::Uuid;

/// WHAT: Launch args render as id|pid|version and parse back
/// WHY: The worker rebuilds its channel identity from this one argument
#[test]
#[allow(clippy::unwrap_used)]
fn given_launch_args_when_rendered_and_parsed_then_equal() {
    // Given: Launch args for a known id
    let id = Uuid::new_v4();
    let args = LaunchArgs {
        correlation_id: id,
        host_pid: 4242,
        host_version: "17.0".to_string(),
    };

    // When: Rendering and parsing
    let rendered = args.to_string();
    let parsed: LaunchArgs = rendered.parse().unwrap();

    // Then: Exact format and same value
    assert_eq!(rendered, format!("{id}|4242|17.0"));
    assert_eq!(parsed, args);
}

/// WHAT: The version field keeps any further delimiters
/// WHY: Only the first two delimiters separate fields
#[test]
#[allow(clippy::unwrap_used)]
fn given_version_with_delimiter_when_parsing_then_kept_whole() {
    // Given: A version string containing '|'
    let raw = format!("{}|1|1.0|beta", Uuid::nil());

    // When: Parsing
    let parsed: LaunchArgs = raw.parse().unwrap();

    // Then: Version is everything after the pid
    assert_eq!(parsed.host_version, "1.0|beta");
}

/// WHAT: Malformed launch strings are rejected
/// WHY: A worker with a bad identity cannot find its channel
#[test]
fn given_malformed_strings_when_parsing_then_invalid_launch_args() {
    for raw in ["", "not-a-uuid|1|1.0", "00000000-0000-0000-0000-000000000000|pid|1.0", "a|b"] {
        // Given/When: Parsing a malformed string
        let result = raw.parse::<LaunchArgs>();

        // Then: InvalidLaunchArgs
        assert!(
            matches!(result, Err(CoreError::InvalidLaunchArgs { .. })),
            "accepted {raw:?}"
        );
    }
}
