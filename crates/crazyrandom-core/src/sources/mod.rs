//! Seed sources available to the [`SeedPool`](crate::pool::SeedPool).

pub mod helpers;

pub mod os;
pub mod timing;

use crate::source::EntropySource;

/// All seed source constructors. Each returns a boxed source.
pub fn all_sources() -> Vec<Box<dyn EntropySource>> {
    vec![
        Box::new(os::OsRandomSource),
        Box::new(timing::ClockJitterSource),
        Box::new(timing::SleepJitterSource),
    ]
}

/// Sources that report themselves available on this machine.
pub fn detect_available_sources() -> Vec<Box<dyn EntropySource>> {
    all_sources()
        .into_iter()
        .filter(|s| s.is_available())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let sources = all_sources();
        let mut names: Vec<_> = sources.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), sources.len());
    }

    #[test]
    fn os_source_is_always_detected() {
        assert!(
            detect_available_sources()
                .iter()
                .any(|s| s.name() == "os_random")
        );
    }
}
