use std::{str::FromStr, sync::Arc, time::Duration};

use anyhow::{Error, Result, anyhow};
use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::batch::ScheduledJob;

/// Fires a job on every tick of a cron expression.
///
/// Classic five-field expressions (`min hour dom month dow`) are accepted with crontab
/// weekday numbering and run at second zero. Each run is awaited before the next tick is computed, so runs of the
/// same job never overlap and a tick that passes while a run is in progress is skipped.
pub struct Scheduler {
    expression: String,
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(expression: &str) -> Result<Self, Error> {
        let normalized = normalize_expression(expression);

        let schedule = Schedule::from_str(&normalized)
            .map_err(|e| anyhow!("Invalid cron expression '{}': {}", expression, e))?;

        Ok(Self {
            expression: expression.trim().to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    pub async fn run(&self, job: Arc<dyn ScheduledJob>, shutdown: CancellationToken) {
        info!(cron = %self.expression, job = job.name(), "Starting scheduler");

        loop {
            let now = Utc::now();
            let Some(next) = self.next_fire_after(now) else {
                warn!(cron = %self.expression, "Cron expression has no upcoming ticks");
                return;
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Stopping scheduler");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            info!(job = job.name(), fired_at = %next, "Scheduled tick");

            // An in-flight run is allowed to finish after shutdown is requested.
            job.run().await;
        }
    }
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Five-field expressions use crontab semantics: a zero seconds field is prepended and
/// numeric weekdays (0-7, both 0 and 7 meaning Sunday) are rewritten as day names.
/// Six and seven field expressions are passed through untouched.
fn normalize_expression(expression: &str) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();

    match fields.as_slice() {
        [minute, hour, day_of_month, month, day_of_week] => format!(
            "0 {} {} {} {} {}",
            minute,
            hour,
            day_of_month,
            month,
            crontab_day_of_week(day_of_week)
        ),
        _ => expression.trim().to_string(),
    }
}

fn crontab_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(|item| match numeric_days(item) {
            Some(days) => days
                .into_iter()
                .map(|day| DAY_NAMES[day])
                .collect::<Vec<_>>()
                .join(","),
            None => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Expands `n`, `a-b`, `*/s`, `n/s` and `a-b/s` into day indexes (0 = Sunday).
/// Anything else, names included, yields `None` and is left to the cron parser.
fn numeric_days(item: &str) -> Option<Vec<usize>> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, step.parse::<usize>().ok().filter(|s| *s > 0)?),
        None => (item, 1),
    };

    let (start, end) = if range == "*" {
        if step == 1 {
            return None;
        }
        (0, 6)
    } else if let Some((start, end)) = range.split_once('-') {
        (start.parse::<usize>().ok()?, end.parse::<usize>().ok()?)
    } else {
        let day = range.parse::<usize>().ok()?;
        if item.contains('/') { (day, 6) } else { (day, day) }
    };

    if start > end || end > 7 {
        return None;
    }

    let mut days: Vec<usize> = (start..=end).step_by(step).map(|day| day % 7).collect();
    days.sort_unstable();
    days.dedup();

    Some(days)
}
