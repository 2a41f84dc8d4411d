use std::fmt;
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for accepted submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub String);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces human-auditable, wall-clock-sortable registration identifiers.
///
/// The base form is `<prefix>-<YYYYMMDDHHMMSS>`. Timestamp-only identifiers
/// collide for submissions landing in the same second, so generations that
/// observe an unchanged stamp receive a monotonic `-<n>` suffix starting at
/// `-2`. The first identifier of any second keeps the bare form.
#[derive(Debug)]
pub struct RegistrationIdGenerator {
    prefix: String,
    state: Mutex<GeneratorState>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_stamp: String,
    sequence: u32,
}

impl RegistrationIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            state: Mutex::new(GeneratorState::default()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn generate(&self) -> RegistrationId {
        self.generate_at(Local::now().naive_local())
    }

    pub fn generate_at(&self, now: NaiveDateTime) -> RegistrationId {
        let stamp = now.format("%Y%m%d%H%M%S").to_string();
        let mut state = self.state.lock().expect("generator mutex poisoned");

        if state.last_stamp == stamp {
            state.sequence += 1;
            RegistrationId(format!("{}-{}-{}", self.prefix, stamp, state.sequence))
        } else {
            state.last_stamp = stamp.clone();
            state.sequence = 1;
            RegistrationId(format!("{}-{}", self.prefix, stamp))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 24)
            .expect("valid date")
            .and_hms_opt(10, 15, second)
            .expect("valid time")
    }

    #[test]
    fn distinct_seconds_yield_bare_timestamp_ids() {
        let generator = RegistrationIdGenerator::new("KV");
        let first = generator.generate_at(at(0));
        let second = generator.generate_at(at(1));

        assert_eq!(first.0, "KV-20250924101500");
        assert_eq!(second.0, "KV-20250924101501");
        assert_ne!(first, second);
    }

    #[test]
    fn same_second_generations_receive_a_suffix() {
        let generator = RegistrationIdGenerator::new("KV");
        let first = generator.generate_at(at(30));
        let second = generator.generate_at(at(30));
        let third = generator.generate_at(at(30));

        assert_eq!(first.0, "KV-20250924101530");
        assert_eq!(second.0, "KV-20250924101530-2");
        assert_eq!(third.0, "KV-20250924101530-3");
    }

    #[test]
    fn suffix_resets_once_the_clock_moves_on() {
        let generator = RegistrationIdGenerator::new("KV");
        generator.generate_at(at(30));
        generator.generate_at(at(30));
        let next = generator.generate_at(at(31));
        assert_eq!(next.0, "KV-20250924101531");
    }

    #[test]
    fn prefix_is_configurable() {
        let generator = RegistrationIdGenerator::new("ACME");
        let id = generator.generate_at(at(5));
        assert!(id.0.starts_with("ACME-"));
    }
}
