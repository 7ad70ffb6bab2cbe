//! Daily randomized schedule. Recomputes 5 random wall-clock slots every
//! morning and fires a relay cycle at each one. The relay core itself never
//! owns the clock: this task is just another trigger.

use crate::prelude::*;
use crate::server::AppState;
use chrono::{Days, Local, NaiveTime};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

const SLOTS_PER_DAY: usize = 5;

/// Posting window: never earlier than 6:00, never later than 23:59
const FIRST_HOUR: u32 = 6;
const LAST_HOUR: u32 = 23;

pub(crate) async fn run(state: Arc<AppState>) {
    loop {
        let slots = plan_daily_slots(&mut rand::thread_rng());

        info!(?slots, "Planned today's relay slots");

        for slot in slots {
            // Slots that are already in the past today are skipped; this
            // happens on startup mid-day and is expected
            let Some(delay) = time_until(slot) else {
                continue;
            };

            tokio::time::sleep(delay).await;

            match state.relay.lock().await.run_cycle().await {
                Ok(report) => info!(
                    source = %report.source_channel,
                    kind = %report.kind,
                    "Scheduled relay cycle finished"
                ),
                // Never fatal: the next slot is attempted regardless
                Err(err) => warn!(err = tracing_err(&err), "Scheduled relay cycle failed"),
            }
        }

        tokio::time::sleep(until_next_midnight()).await;
    }
}

fn plan_daily_slots(rng: &mut impl Rng) -> Vec<NaiveTime> {
    let mut slots: Vec<_> = (0..SLOTS_PER_DAY)
        .map(|_| {
            let hour = rng.gen_range(FIRST_HOUR..=LAST_HOUR);
            let minute = rng.gen_range(0..=59);
            NaiveTime::from_hms_opt(hour, minute, 0).expect("BUG: the slot bounds are valid")
        })
        .collect();

    slots.sort();
    slots
}

fn time_until(slot: NaiveTime) -> Option<Duration> {
    let now = Local::now().naive_local();
    let target = now.date().and_time(slot);

    (target - now).to_std().ok()
}

fn until_next_midnight() -> Duration {
    let now = Local::now().naive_local();
    let midnight = (now.date() + Days::new(1))
        .and_hms_opt(0, 0, 0)
        .expect("BUG: midnight is a valid time");

    (midnight - now).to_std().unwrap_or_default()
}
