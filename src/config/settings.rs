#[derive(Debug, Clone)]
pub struct LadderSettings {
    /// Display name used in chat notifications.
    pub name: String,
    /// How many positions above their own a player may challenge.
    pub rank_window: i64,
    /// Business days granted to play a freshly created challenge.
    pub initial_days_to_play: i64,
    /// Upper bound the opponent can extend the deadline to.
    pub max_days_to_play: i64,
    /// Rest window after a played match, in hours.
    pub cooldown_hours: i64,
    /// Consecutive incoming challenges required before declining is allowed.
    pub decline_streak: usize,
}

impl Default for LadderSettings {
    fn default() -> Self {
        Self {
            name: "Pool Ladder".to_string(),
            rank_window: 2,
            initial_days_to_play: 3,
            max_days_to_play: 5,
            cooldown_hours: 4,
            decline_streak: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Deadlines are measured in business days, so minutes are plenty.
    pub interval_secs: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ladder: LadderSettings,
    pub sweep: SweepSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            ladder: LadderSettings::default(),
            sweep: SweepSettings::default(),
        }
    }
}
