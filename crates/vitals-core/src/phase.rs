use crate::registry::AppConfig;
use crate::{Error, Result};
use std::fmt;

/// Navigation states of one app's collection, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Metrics,
    Crashes,
    NonFatals,
    AnrMetrics,
    Anrs,
    IosMetrics,
    IosCrashes,
    IosNonFatals,
    PlayConsoleAnrs,
    IosDominantRelease,
    AndroidDominantRelease,
    AndroidP90Launch,
}

impl Phase {
    pub const ALL: [Phase; 12] = [
        Phase::Metrics,
        Phase::Crashes,
        Phase::NonFatals,
        Phase::AnrMetrics,
        Phase::Anrs,
        Phase::IosMetrics,
        Phase::IosCrashes,
        Phase::IosNonFatals,
        Phase::PlayConsoleAnrs,
        Phase::IosDominantRelease,
        Phase::AndroidDominantRelease,
        Phase::AndroidP90Launch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Metrics => "metrics",
            Phase::Crashes => "crashes",
            Phase::NonFatals => "non_fatals",
            Phase::AnrMetrics => "anr_metrics",
            Phase::Anrs => "anrs",
            Phase::IosMetrics => "ios_metrics",
            Phase::IosCrashes => "ios_crashes",
            Phase::IosNonFatals => "ios_non_fatals",
            Phase::PlayConsoleAnrs => "play_console_anrs",
            Phase::IosDominantRelease => "ios_dominant_release",
            Phase::AndroidDominantRelease => "android_dominant_release",
            Phase::AndroidP90Launch => "android_p90_launch",
        }
    }

    pub fn is_ios(&self) -> bool {
        matches!(
            self,
            Phase::IosMetrics | Phase::IosCrashes | Phase::IosNonFatals | Phase::IosDominantRelease
        )
    }

    /// Whether the app's capability flags include this phase
    pub fn applies_to(&self, app: &AppConfig) -> bool {
        match self {
            Phase::IosMetrics
            | Phase::IosCrashes
            | Phase::IosNonFatals
            | Phase::IosDominantRelease => app.has_ios(),
            Phase::AndroidP90Launch => app.has_startup_latency_trace,
            _ => true,
        }
    }

    /// Ordered phase list for one app, with capability-gated stages removed
    pub fn plan(app: &AppConfig) -> Vec<Phase> {
        Phase::ALL
            .iter()
            .copied()
            .filter(|phase| phase.applies_to(app))
            .collect()
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single "currently expected response" cursor plus one completion flag per phase.
///
/// Created fresh per app. Mutated only through the named transitions below.
#[derive(Debug, Clone, Default)]
pub struct PhaseState {
    active: Option<Phase>,
    complete: [bool; Phase::ALL.len()],
}

impl PhaseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<Phase> {
        self.active
    }

    pub fn is_active(&self, phase: Phase) -> bool {
        self.active == Some(phase)
    }

    /// Make `phase` the active phase. Phases only move forward.
    pub fn enter(&mut self, phase: Phase) -> Result<()> {
        if let Some(current) = self.active
            && phase <= current
        {
            return Err(Error::PhaseOrder {
                from: current.to_string(),
                to: phase.to_string(),
            });
        }

        tracing::debug!("Entering phase {}", phase);
        self.active = Some(phase);
        Ok(())
    }

    pub fn is_complete(&self, phase: Phase) -> bool {
        self.complete[phase.index()]
    }

    pub fn complete(&mut self, phase: Phase) {
        self.complete[phase.index()] = true;
    }

    /// Mark `phase` complete without its data. Returns false if it was already complete.
    pub fn force_complete(&mut self, phase: Phase) -> bool {
        let was_complete = self.is_complete(phase);
        self.complete(phase);
        !was_complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AppRegistry;

    #[test]
    fn test_plan_for_android_only_app() {
        let registry = AppRegistry::builtin();
        let plan = Phase::plan(registry.get("partner").unwrap());

        assert_eq!(
            plan,
            vec![
                Phase::Metrics,
                Phase::Crashes,
                Phase::NonFatals,
                Phase::AnrMetrics,
                Phase::Anrs,
                Phase::PlayConsoleAnrs,
                Phase::AndroidDominantRelease,
                Phase::AndroidP90Launch,
            ]
        );
    }

    #[test]
    fn test_plan_for_ios_app_without_launch_trace() {
        let registry = AppRegistry::builtin();
        let plan = Phase::plan(registry.get("owner").unwrap());

        assert!(plan.contains(&Phase::IosMetrics));
        assert!(plan.contains(&Phase::IosDominantRelease));
        assert!(!plan.contains(&Phase::AndroidP90Launch));
        assert!(plan.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_phases_only_move_forward() {
        let mut state = PhaseState::new();
        assert_eq!(state.active(), None);

        state.enter(Phase::Metrics).unwrap();
        state.enter(Phase::Crashes).unwrap();
        assert!(state.is_active(Phase::Crashes));

        assert!(state.enter(Phase::Crashes).is_err());
        assert!(state.enter(Phase::Metrics).is_err());
        // skipping gated phases is allowed
        state.enter(Phase::PlayConsoleAnrs).unwrap();
    }

    #[test]
    fn test_force_complete_reports_whether_it_forced() {
        let mut state = PhaseState::new();
        assert!(state.force_complete(Phase::IosMetrics));
        assert!(state.is_complete(Phase::IosMetrics));
        assert!(!state.force_complete(Phase::IosMetrics));
    }
}
