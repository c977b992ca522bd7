use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` span of UTC time during which recording is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A change of schedule state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub time: DateTime<Utc>,
    /// `true` when recording begins at `time`.
    pub state: bool,
}

/// A recording schedule: a set of disjoint intervals in ascending order.
///
/// Intervals are normalized on construction. Empty intervals are dropped and
/// overlapping or touching ones are merged, so consecutive transitions always
/// alternate between on and off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Interval>", into = "Vec<Interval>")]
pub struct Schedule {
    intervals: Vec<Interval>,
}

impl Schedule {
    pub fn new(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut intervals: Vec<Interval> = intervals.into_iter().filter(|i| !i.is_empty()).collect();
        intervals.sort_by_key(|i| i.start);

        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match merged.last_mut() {
                Some(last) if interval.start <= last.end => {
                    last.end = last.end.max(interval.end);
                }
                _ => merged.push(interval),
            }
        }

        Self { intervals: merged }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Whether recording is scheduled at `time`.
    pub fn state_at(&self, time: DateTime<Utc>) -> bool {
        // Intervals are sorted and disjoint: find the last one starting at or before `time`.
        let index = self.intervals.partition_point(|i| i.start <= time);
        index > 0 && self.intervals[index - 1].contains(time)
    }

    /// All transitions, in order.
    pub fn transitions(&self) -> impl Iterator<Item = Transition> + '_ {
        self.intervals.iter().flat_map(|i| {
            [
                Transition {
                    time: i.start,
                    state: true,
                },
                Transition {
                    time: i.end,
                    state: false,
                },
            ]
        })
    }

    /// The first transition strictly after `time`, if any.
    pub fn next_transition_after(&self, time: DateTime<Utc>) -> Option<Transition> {
        self.transitions().find(|t| t.time > time)
    }
}

impl From<Vec<Interval>> for Schedule {
    fn from(intervals: Vec<Interval>) -> Self {
        Self::new(intervals)
    }
}

impl From<Schedule> for Vec<Interval> {
    fn from(schedule: Schedule) -> Self {
        schedule.intervals
    }
}
