use crate::{ConsoleSession, Error, Result, Supervisor, SupervisorConfig};
use chrono::NaiveDate;
use std::time::Duration;
use vitals_core::{AppConfig, AppResult, ConsoleUrls, Phase, ReportWindow};

/// Time the previous page is given to settle before the next phase starts
pub fn settle_pause(phase: Phase) -> Duration {
    match phase {
        // first page of the app, and the two phases that stay on the page before them
        Phase::Metrics | Phase::Anrs | Phase::IosCrashes => Duration::ZERO,
        Phase::Crashes => Duration::from_secs(2),
        _ => Duration::from_secs(3),
    }
}

async fn navigate<S: ConsoleSession + ?Sized>(
    supervisor: &mut Supervisor<'_, S>,
    phase: Phase,
    url: &str,
) -> Result<()> {
    tracing::debug!("Opening {} page: {}", phase, url);
    supervisor.session().navigate(url).await.map_err(|e| match e {
        Error::Navigation { .. } | Error::Session(_) => e,
        other => Error::Navigation {
            url: url.to_string(),
            reason: other.to_string(),
        },
    })
}

/// The iOS issue page often renders from cache without issuing a metrics
/// report. Two soft reloads and a cache-bypassing one get it to.
///
/// A failed reload only skips the current app. A session that really died
/// surfaces on the next response read.
async fn reload_until_fresh<S: ConsoleSession + ?Sized>(
    supervisor: &mut Supervisor<'_, S>,
    url: &str,
) -> Result<()> {
    let app_failure = |e: Error| match e {
        Error::Navigation { .. } => e,
        other => Error::Navigation {
            url: url.to_string(),
            reason: format!("reload failed: {}", other),
        },
    };

    supervisor.idle(Duration::from_secs(3)).await?;
    supervisor.session().reload().await.map_err(app_failure)?;
    supervisor.idle(Duration::from_secs(2)).await?;
    supervisor.session().reload().await.map_err(app_failure)?;
    supervisor.session().hard_reload().await.map_err(app_failure)
}

/// Run every phase of `app`'s plan against `session` and return what was captured.
///
/// Phases that time out leave their fields empty. Errors are either app-level
/// (navigation, phase order) or fatal session failures, see [`Error::is_fatal`].
pub async fn collect_app<S: ConsoleSession + ?Sized>(
    session: &mut S,
    app: &AppConfig,
    window: ReportWindow,
    config: &SupervisorConfig,
    today: NaiveDate,
) -> Result<AppResult> {
    let urls = ConsoleUrls::build(window, app);
    let plan = Phase::plan(app);
    let mut supervisor = Supervisor::new(session, app, window, config, today);

    tracing::debug!(
        "Plan for {}: {}",
        app.key,
        plan.iter().map(Phase::as_str).collect::<Vec<_>>().join(" → ")
    );

    for phase in plan {
        let pause = settle_pause(phase);
        if !pause.is_zero() {
            supervisor.idle(pause).await?;
        }

        supervisor.collection_mut().phases_mut().enter(phase)?;

        if phase == Phase::IosMetrics {
            tracing::info!("📱 Starting iOS data collection...");
        }
        if let Some(url) = urls.for_phase(phase) {
            navigate(&mut supervisor, phase, url).await?;
            if phase == Phase::IosMetrics {
                reload_until_fresh(&mut supervisor, url).await?;
            }
        }

        supervisor.await_phase(phase).await?;
    }

    let collection = supervisor.into_collection();
    if collection.ios_issues_before_installs() {
        tracing::debug!("{}: iOS non-fatal list arrived before its install counts", app.key);
    }
    Ok(collection.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_pauses() {
        assert_eq!(settle_pause(Phase::Metrics), Duration::ZERO);
        assert_eq!(settle_pause(Phase::Crashes), Duration::from_secs(2));
        assert_eq!(settle_pause(Phase::NonFatals), Duration::from_secs(3));
        assert_eq!(settle_pause(Phase::Anrs), Duration::ZERO);
        assert_eq!(settle_pause(Phase::IosCrashes), Duration::ZERO);
        assert_eq!(settle_pause(Phase::AndroidP90Launch), Duration::from_secs(3));
    }
}
