/*
Parameter Automation Timeline
=============================

A timeline holds time-stamped requests against one parameter (a gain). The
control side never writes samples; it only schedules, and the render side asks
"what is the value at time t?" for every sample it produces.

Vocabulary
----------

  set     Jump to `value` at absolute time `time`.

  ramp    Starting at `start`, move linearly from whatever the parameter is
          worth at that instant to `target`, arriving at `end`.

  cancel  Drop every event starting at or after `time` and hold the value
          the parameter had at `time`.


Evaluation
----------

Events are kept sorted by start time (insertion order breaks ties). To get the
value at t we walk the events that have started by t, tracking the value the
parameter would have at each event's start:

    value  1.0 ┐          ramp(1.0, 0..A)
               │       ╱╲___________ ramp(S, A..A+D)
           S   │      ╱             ╲
               │     ╱               ╲  cancel(t_r) + set(v, t_r) + ramp(0, t_r..t_r+R)
           0.0 └────╱─────────────────╲──→ time
                   0  A    A+D      t_r  t_r+R

A ramp's starting value is read from the curve AT the ramp's start time, not
from the previous event's target. So a release that starts halfway up an
attack begins from the instantaneous level, which is what keeps note-offs
click-free.

Compaction
----------

Timelines live as long as their gain node, so fully elapsed history is folded
into a single `set` by `compact(now)`. Evaluation at or after `now` is
unchanged by compaction.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    Set { time: f64, value: f32 },
    Ramp { start: f64, end: f64, target: f32 },
}

impl AutomationEvent {
    fn start(&self) -> f64 {
        match *self {
            AutomationEvent::Set { time, .. } => time,
            AutomationEvent::Ramp { start, .. } => start,
        }
    }
}

/// A ramp that has begun, with its starting value resolved.
#[derive(Debug, Clone, Copy)]
struct ActiveRamp {
    start: f64,
    end: f64,
    from: f32,
    target: f32,
}

impl ActiveRamp {
    #[inline]
    fn value_at(&self, t: f64) -> f32 {
        if t >= self.end || self.end <= self.start {
            return self.target;
        }
        let progress = ((t - self.start) / (self.end - self.start)) as f32;
        self.from + (self.target - self.from) * progress
    }
}

#[derive(Debug, Clone)]
pub struct ParamTimeline {
    initial: f32,
    events: Vec<AutomationEvent>,
}

impl ParamTimeline {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::Set { time, value });
    }

    /// Ramp linearly to `target`, starting at `at` and lasting `duration` seconds.
    pub fn ramp_to(&mut self, target: f32, at: f64, duration: f64) {
        let duration = duration.max(0.0);
        self.insert(AutomationEvent::Ramp {
            start: at,
            end: at + duration,
            target,
        });
    }

    /// Cancel every event starting at or after `time`, holding the value at `time`.
    pub fn cancel_after(&mut self, time: f64) {
        let held = self.value_at(time);
        let in_flight = self.ramp_in_flight(time);

        self.events.retain(|event| event.start() < time);

        // An in-flight ramp would keep moving past `time`; pin it.
        if in_flight {
            self.events.push(AutomationEvent::Set { time, value: held });
        }
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let mut value = self.initial;
        let mut active: Option<ActiveRamp> = None;

        for event in self.events.iter().take_while(|event| event.start() <= t) {
            let start = event.start();
            let value_at_start = match active {
                Some(ramp) => ramp.value_at(start),
                None => value,
            };

            match *event {
                AutomationEvent::Set { value: v, .. } => {
                    value = v;
                    active = None;
                }
                AutomationEvent::Ramp { start, end, target } => {
                    value = value_at_start;
                    active = Some(ActiveRamp {
                        start,
                        end,
                        from: value_at_start,
                        target,
                    });
                }
            }
        }

        match active {
            Some(ramp) => ramp.value_at(t),
            None => value,
        }
    }

    /// Fold everything that is fully in the past into a single `set`.
    pub fn compact(&mut self, now: f64) {
        let settled = self
            .events
            .iter()
            .take_while(|event| match **event {
                AutomationEvent::Set { time, .. } => time <= now,
                AutomationEvent::Ramp { end, .. } => end <= now,
            })
            .count();

        if settled == 0 {
            return;
        }

        // Later events may still start before `now`; those keep their own history.
        let still_pending = self.events[settled..]
            .iter()
            .any(|event| event.start() <= now);
        if still_pending {
            return;
        }

        let last_start = self.events[settled - 1].start();
        let value = self.value_at(last_start.max(self.settled_end(settled)));
        self.initial = value;
        self.events.drain(..settled);
    }

    fn settled_end(&self, settled: usize) -> f64 {
        self.events[..settled]
            .iter()
            .map(|event| match *event {
                AutomationEvent::Set { time, .. } => time,
                AutomationEvent::Ramp { end, .. } => end,
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn ramp_in_flight(&self, time: f64) -> bool {
        let mut in_flight = false;
        for event in self.events.iter().take_while(|event| event.start() < time) {
            in_flight = match *event {
                AutomationEvent::Set { .. } => false,
                AutomationEvent::Ramp { end, .. } => end > time,
            };
        }
        in_flight
    }

    fn insert(&mut self, event: AutomationEvent) {
        let start = event.start();
        let position = self.events.partition_point(|existing| existing.start() <= start);
        self.events.insert(position, event);
    }
}
