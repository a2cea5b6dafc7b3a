use crate::config::ResumeSettings;
use crate::network::ProgressRecord;

pub const MIN_RESUME_SECS: f64 = 120.0;
pub const COMPLETED_PERCENT: f64 = 90.0;
pub const PREVIEW_OFFSET_FRACTION: f64 = 0.1;

/// Whether and where a session should resume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumeDecision {
    pub can_resume: bool,
    pub resume_at_seconds: f64,
}

impl ResumeDecision {
    pub fn start_over() -> Self {
        Self {
            can_resume: false,
            resume_at_seconds: 0.0,
        }
    }
}

/// Share of `duration` covered by `position`, in percent
pub fn percentage(position: f64, duration: f64) -> f64 {
    if duration <= 0.0 || !duration.is_finite() || !position.is_finite() {
        return 0.0;
    }
    (position / duration * 100.0).clamp(0.0, 100.0)
}

/// Default start position when nothing is resumable
pub fn preview_offset(duration: f64, fraction: f64) -> f64 {
    if duration <= 0.0 || !duration.is_finite() {
        return 0.0;
    }
    duration * fraction
}

/// Resume rules with configurable thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumePolicy {
    min_resume_secs: f64,
    completed_percent: f64,
}

impl ResumePolicy {
    pub fn new(settings: &ResumeSettings) -> Self {
        Self {
            min_resume_secs: settings.min_resume_secs,
            completed_percent: settings.completed_percent,
        }
    }

    pub fn is_completed(&self, position: f64, duration: f64) -> bool {
        percentage(position, duration) >= self.completed_percent
    }

    pub fn can_resume(&self, position: f64, duration: f64) -> bool {
        position >= self.min_resume_secs && !self.is_completed(position, duration)
    }

    /// Decide from a fetched record; a missing record never resumes
    pub fn decide(&self, record: Option<&ProgressRecord>) -> ResumeDecision {
        match record {
            Some(record) if self.can_resume(record.position_seconds, record.duration_seconds) => {
                ResumeDecision {
                    can_resume: true,
                    resume_at_seconds: record.position_seconds,
                }
            }
            _ => ResumeDecision::start_over(),
        }
    }
}

impl Default for ResumePolicy {
    fn default() -> Self {
        Self {
            min_resume_secs: MIN_RESUME_SECS,
            completed_percent: COMPLETED_PERCENT,
        }
    }
}

pub fn is_completed(position: f64, duration: f64) -> bool {
    ResumePolicy::default().is_completed(position, duration)
}

pub fn can_resume(position: f64, duration: f64) -> bool {
    ResumePolicy::default().can_resume(position, duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(position: f64, duration: f64) -> ProgressRecord {
        ProgressRecord::new("movie-1", position, duration, "desktop", "linux")
    }

    #[test]
    fn test_resume_threshold() {
        assert!(!can_resume(119.0, 1000.0));
        assert!(can_resume(120.0, 1000.0));
        assert!(!can_resume(950.0, 1000.0));
    }

    #[test]
    fn test_completed_at_ninety_percent() {
        assert!(!is_completed(899.0, 1000.0));
        assert!(is_completed(900.0, 1000.0));
        assert!(!is_completed(500.0, 0.0));
    }

    #[test]
    fn test_percentage_edge_cases() {
        assert_eq!(percentage(50.0, 200.0), 25.0);
        assert_eq!(percentage(10.0, 0.0), 0.0);
        assert_eq!(percentage(300.0, 200.0), 100.0);
        assert_eq!(percentage(f64::NAN, 200.0), 0.0);
    }

    #[test]
    fn test_decide_resumes_midway() {
        let decision = ResumePolicy::default().decide(Some(&record(125.0, 1000.0)));
        assert!(decision.can_resume);
        assert_eq!(decision.resume_at_seconds, 125.0);
    }

    #[test]
    fn test_decide_completed_starts_over() {
        let decision = ResumePolicy::default().decide(Some(&record(950.0, 1000.0)));
        assert_eq!(decision, ResumeDecision::start_over());
        assert_eq!(preview_offset(1000.0, PREVIEW_OFFSET_FRACTION), 100.0);
    }

    #[test]
    fn test_decide_without_record() {
        assert_eq!(ResumePolicy::default().decide(None), ResumeDecision::start_over());
    }

    #[test]
    fn test_custom_thresholds() {
        let policy = ResumePolicy::new(&ResumeSettings {
            min_resume_secs: 30.0,
            completed_percent: 95.0,
        });
        assert!(policy.can_resume(30.0, 1000.0));
        assert!(policy.can_resume(940.0, 1000.0));
        assert!(!policy.can_resume(950.0, 1000.0));
    }
}
