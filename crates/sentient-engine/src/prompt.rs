//! Governing directive for the reasoning engine.
//!
//! The directive is a pure function of the current time. It is rebuilt for
//! every request so that relative dates ("tomorrow") resolve correctly.

use chrono::DateTime;
use chrono_tz::Tz;

const DIRECTIVE_TEMPLATE: &str = include_str!("../prompts/directive.txt");

/// Reply the engine is told to give when asked about the user with an empty memory.
pub const NO_STORED_FACTS_REPLY: &str = "I don't have any stored information about you yet.";

/// Render the directive for `now`. The timestamp line is the only part that
/// depends on the clock.
pub fn compose_directive(now: &DateTime<Tz>) -> String {
    DIRECTIVE_TEMPLATE
        .replace("{{current_time}}", &format_timestamp(now))
        .replace("{{timezone}}", now.timezone().name())
        .replace("{{no_facts_reply}}", NO_STORED_FACTS_REPLY)
        .trim_end()
        .to_string()
}

fn format_timestamp(now: &DateTime<Tz>) -> String {
    format!(
        "{} ({})",
        now.format("%A, %B %-d, %Y %H:%M:%S %Z"),
        now.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(tz: Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn without_timestamp(directive: &str) -> Vec<&str> {
        directive
            .lines()
            .filter(|l| !l.starts_with("Current time:"))
            .collect()
    }

    #[test]
    fn embeds_current_time() {
        let now = at(chrono_tz::UTC, 2026, 10, 17, 9, 30, 0);
        let directive = compose_directive(&now);
        assert!(directive.contains("Current time: Saturday, October 17, 2026 09:30:00 UTC"));
        assert!(directive.contains("2026-10-17T09:30:00+00:00"));
        assert!(directive.contains("Timezone: UTC"));
    }

    #[test]
    fn one_second_apart_differs_only_in_timestamp() {
        let first = at(chrono_tz::Europe::Berlin, 2026, 3, 1, 23, 59, 59);
        let second = first + chrono::Duration::seconds(1);

        let a = compose_directive(&first);
        let b = compose_directive(&second);
        assert_ne!(a, b);
        assert_eq!(without_timestamp(&a), without_timestamp(&b));

        let diff: Vec<_> = a.lines().zip(b.lines()).filter(|(x, y)| x != y).collect();
        assert_eq!(diff.len(), 1);
        assert!(diff[0].0.starts_with("Current time:"));
    }

    #[test]
    fn is_deterministic_for_same_instant() {
        let now = at(chrono_tz::America::New_York, 2026, 7, 4, 12, 0, 0);
        assert_eq!(compose_directive(&now), compose_directive(&now));
    }

    #[test]
    fn carries_every_policy_rule() {
        let directive = compose_directive(&at(chrono_tz::UTC, 2026, 1, 1, 0, 0, 0));
        for needle in [
            "consult_memory before acting",
            "save_to_memory",
            "wait for explicit confirmation",
            "only from emails you have read",
            "call list_events",
            "one hour",
            "ask for confirmation before doing anything irreversible",
            "clear_memory",
            NO_STORED_FACTS_REPLY,
        ] {
            assert!(directive.contains(needle), "missing: {needle}");
        }
        assert!(!directive.contains("{{"));
    }
}
