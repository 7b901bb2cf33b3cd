//! Countdown for the active section.
//!
//! The timer does not schedule anything itself. A driver calls [`SectionTimer::tick`]
//! once per second with the ticket it was handed when the countdown started.
//! Every reconfiguration or cancellation bumps the generation, so ticks from a
//! driver that outlived its context are rejected as stale.
//!
//! Each tick removes exactly one second; wall-clock drift between ticks is not
//! corrected. That is acceptable for exam-length countdowns.

/// Authorises ticks for one timing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTicket {
    generation: u64,
}

impl TimerTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The ticket no longer matches, or the timer is not running.
    Stale,
    Running { remaining: u32 },
    /// Reached zero on this tick. Reported once; the timer stops.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTimer {
    duration: u32,
    remaining: u32,
    generation: u64,
    running: bool,
}

impl SectionTimer {
    /// A stopped timer previewing `duration` seconds.
    #[must_use]
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            remaining: duration,
            generation: 0,
            running: false,
        }
    }

    /// Reset to `duration` seconds, stopped, invalidating outstanding tickets.
    pub fn configure(&mut self, duration: u32) {
        self.duration = duration;
        self.remaining = duration;
        self.running = false;
        self.generation += 1;
    }

    /// Begin counting down. Starting a running timer returns its current ticket.
    pub fn start(&mut self) -> TimerTicket {
        self.running = true;
        self.current_ticket()
    }

    /// Stop and invalidate outstanding tickets. Remaining time is kept.
    pub fn cancel(&mut self) {
        self.running = false;
        self.generation += 1;
    }

    pub fn tick(&mut self, ticket: TimerTicket) -> TickOutcome {
        if !self.running || ticket.generation != self.generation {
            return TickOutcome::Stale;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            TickOutcome::Expired
        } else {
            TickOutcome::Running {
                remaining: self.remaining,
            }
        }
    }

    #[must_use]
    pub fn ticket(&self) -> Option<TimerTicket> {
        self.running.then(|| self.current_ticket())
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn current_ticket(&self) -> TimerTicket {
        TimerTicket {
            generation: self.generation,
        }
    }
}

/// `H:MM:SS` when an hour or more remains, otherwise `M:SS`.
#[must_use]
pub fn format_clock(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
