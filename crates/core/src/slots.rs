//! Slot generation
//!
//! Slots are derived purely from the staff schedule. Service length is a
//! separate filter applied on top, so the base sequence stays the same for
//! every service.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::models::DEFAULT_DURATION_MINUTES;
use crate::schedule::WeeklySchedule;

/// Every slot start in the working window of `date`, ascending.
///
/// The first slot is exactly the opening time; the last is the largest step
/// strictly before closing. Empty on a day off. A zero step uses the default
/// slot size.
pub fn generate_slots(schedule: &WeeklySchedule, date: NaiveDate, step_minutes: u32) -> Vec<NaiveTime> {
    let Some((start, end)) = schedule.working_window(date) else {
        return Vec::new();
    };

    let step = Duration::minutes(i64::from(effective_step(step_minutes)));
    let mut slots = Vec::new();
    let mut current = start;

    while current < end {
        slots.push(current);
        // overflowing_add_signed wraps past midnight; stop instead
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 || next <= current {
            break;
        }
        current = next;
    }

    slots
}

/// Whether an appointment of `duration_minutes` starting at `time` ends by closing
pub fn fits_service(
    schedule: &WeeklySchedule,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: u32,
) -> bool {
    let Some((start, end)) = schedule.working_window(date) else {
        return false;
    };
    if time < start {
        return false;
    }

    let duration = if duration_minutes == 0 {
        DEFAULT_DURATION_MINUTES
    } else {
        duration_minutes
    };
    let (finish, wrapped) = time.overflowing_add_signed(Duration::minutes(i64::from(duration)));
    wrapped == 0 && finish <= end
}

/// Base slots with the ones that would run past closing removed
pub fn slots_for_service(
    schedule: &WeeklySchedule,
    date: NaiveDate,
    step_minutes: u32,
    duration_minutes: u32,
) -> Vec<NaiveTime> {
    generate_slots(schedule, date, step_minutes)
        .into_iter()
        .filter(|&time| fits_service(schedule, date, time, duration_minutes))
        .collect()
}

fn effective_step(step_minutes: u32) -> u32 {
    if step_minutes == 0 {
        DEFAULT_DURATION_MINUTES
    } else {
        step_minutes
    }
}
