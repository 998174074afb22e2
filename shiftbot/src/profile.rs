use serde::{Deserialize, Serialize};

/// Performance presets controlling how fast the loop drives the target app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedProfile {
    /// Short cooldowns, for fast devices with a responsive app
    Fast,
    /// Balanced default
    #[default]
    Normal,
    /// Generous waits for slow devices or congested networks
    Slow,
}

impl SpeedProfile {
    /// Minimum gap between two dispatched actions, before jitter
    pub fn click_delay_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 110,
            SpeedProfile::Normal => 220,
            SpeedProfile::Slow => 360,
        }
    }

    /// Upper bound of the random jitter added to every click delay (15%)
    pub fn click_jitter_ms(self) -> u64 {
        self.click_delay_ms() * 15 / 100
    }

    /// How long a list screen may stay half-loaded before recovery kicks in
    pub fn load_wait_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 280,
            SpeedProfile::Normal => 450,
            SpeedProfile::Slow => 750,
        }
    }

    /// Reschedule interval after a tick that did work
    pub fn active_poll_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 70,
            SpeedProfile::Normal => 110,
            SpeedProfile::Slow => 170,
        }
    }

    /// Reschedule interval after an idle tick
    pub fn idle_poll_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 220,
            SpeedProfile::Normal => 300,
            SpeedProfile::Slow => 450,
        }
    }

    pub fn gesture_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 55,
            SpeedProfile::Normal => 70,
            SpeedProfile::Slow => 90,
        }
    }

    /// Extra pause after tapping a warehouse's booking button
    pub fn warehouse_delay_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 200,
            SpeedProfile::Normal => 350,
            SpeedProfile::Slow => 600,
        }
    }

    /// Without progress for this long, the step counter is reset
    pub fn step_timeout_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 5000,
            SpeedProfile::Normal => 6000,
            SpeedProfile::Slow => 8000,
        }
    }

    /// Ticks inside this window after a navigation action do nothing
    pub fn settle_window_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 600,
            SpeedProfile::Normal => 800,
            SpeedProfile::Slow => 1200,
        }
    }

    pub fn scroll_delay_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 45,
            SpeedProfile::Normal => 65,
            SpeedProfile::Slow => 95,
        }
    }

    /// Time the warehouse list gets to render after the filter closes
    pub fn warehouse_wait_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 1500,
            SpeedProfile::Normal => 2000,
            SpeedProfile::Slow => 2500,
        }
    }

    pub fn filter_open_wait_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 1200,
            SpeedProfile::Normal => 1600,
            SpeedProfile::Slow => 2000,
        }
    }

    pub fn filter_toggle_wait_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 600,
            SpeedProfile::Normal => 900,
            SpeedProfile::Slow => 1200,
        }
    }

    pub fn filter_close_wait_ms(self) -> u64 {
        match self {
            SpeedProfile::Fast => 800,
            SpeedProfile::Normal => 1200,
            SpeedProfile::Slow => 1600,
        }
    }

    /// Poll interval for the outcome of the previous tick
    pub fn next_interval_ms(self, was_active: bool) -> u64 {
        if was_active {
            self.active_poll_ms()
        } else {
            self.idle_poll_ms()
        }
    }
}

impl std::fmt::Display for SpeedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SpeedProfile::Fast => "fast",
            SpeedProfile::Normal => "normal",
            SpeedProfile::Slow => "slow",
        };
        f.write_str(name)
    }
}
