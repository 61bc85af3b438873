//! Overlay configuration.
//!
//! Plain serde data shared behind a `RwLock`; the hosting layer owns
//! persistence and hands the scan pipeline a clone per cycle so a config
//! write mid-cycle cannot tear a decision in half.

/// User-facing overlay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Master switch for the whole overlay. Off means no scanning at all.
    pub enabled: bool,

    /// Show bronze-tier container labels.
    pub show_bronze_chests: bool,
    /// Show silver-tier container labels.
    pub show_silver_chests: bool,
    /// Show gold-tier container labels.
    pub show_gold_chests: bool,
    /// Show mimic-container labels.
    pub show_mimic_chests: bool,
    /// Show hazard-reward and hoard-container labels.
    pub show_hoards: bool,
    /// Show trap labels.
    pub show_traps: bool,
    /// Show zone-return labels.
    pub show_returns: bool,
    /// Show zone-passage labels.
    pub show_passages: bool,

    /// Master switch for automatic container opening.
    pub open_chests: bool,
    /// Auto-open bronze-tier containers.
    pub open_bronze_chests: bool,
    /// Auto-open silver-tier containers.
    pub open_silver_chests: bool,
    /// Auto-open gold-tier containers.
    pub open_gold_chests: bool,
    /// Auto-open hoard containers.
    pub open_hoard_chests: bool,
    /// Opt in to opening containers in floor sets where their tier carries
    /// the ambush risk.
    pub open_unsafe_chests: bool,

    /// Pop the main overlay window automatically when a run starts.
    pub auto_open_on_enter: bool,

    /// Opt in to uploading per-floor creature sighting reports.
    pub telemetry_opt_in: bool,
    /// Pseudonymous sender id attached to telemetry reports.
    pub sender_id: String,

    /// Append template and name ids to entity labels.
    pub show_debug: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_bronze_chests: true,
            show_silver_chests: true,
            show_gold_chests: true,
            show_mimic_chests: true,
            show_hoards: true,
            show_traps: true,
            show_returns: true,
            show_passages: true,
            open_chests: false,
            open_bronze_chests: true,
            open_silver_chests: false,
            open_gold_chests: false,
            open_hoard_chests: false,
            open_unsafe_chests: false,
            auto_open_on_enter: true,
            telemetry_opt_in: false,
            sender_id: String::new(),
            show_debug: false,
        }
    }
}
