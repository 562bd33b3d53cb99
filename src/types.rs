// Strong typing over raw numbers. Newtypes for timestamps, angles, and identifiers.
// Value objects shared by every engine module live here; logic lives in the modules.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::error::WheelError;

/// Degrees in one full turn of the wheel.
pub const FULL_TURN: f64 = 360.0;

/// Timestamp in milliseconds on the host clock. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    /// Converts a JS clock reading (`performance.now()` style). Negative and
    /// non-finite readings clamp to zero.
    pub fn from_js_millis(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Timestamp(ms as u64)
        } else {
            Timestamp(0)
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn after(&self, delay_ms: u64) -> Self {
        Timestamp(self.0.saturating_add(delay_ms))
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn millis_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Rotation angle in degrees. Not normalized: cumulative rotation keeps growing.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
pub struct Degrees(f64);

impl Degrees {
    pub const ZERO: Degrees = Degrees(0.0);

    pub fn new(deg: f64) -> Self {
        Degrees(deg)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Angle folded into `[0, 360)`.
    pub fn normalized(&self) -> f64 {
        ((self.0 % FULL_TURN) + FULL_TURN) % FULL_TURN
    }

    /// Largest whole-turn multiple not above this angle.
    pub fn whole_turns(&self) -> Degrees {
        Degrees((self.0 / FULL_TURN).floor() * FULL_TURN)
    }
}

impl Add<f64> for Degrees {
    type Output = Degrees;

    fn add(self, rhs: f64) -> Degrees {
        Degrees(self.0 + rhs)
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}°", self.0)
    }
}

/// Stable category identifier, compared by equality only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(u64);

impl CategoryId {
    pub fn new(id: u64) -> Self {
        CategoryId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Spin session generation. Bumped on every start and reset so callbacks
/// scheduled by an older session can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        SessionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> SessionId {
        SessionId(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One weighted item on a wheel face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Display color, passed through untouched.
    #[serde(default)]
    pub color: String,
    /// Rarity weight in `1..=100`. Stored as `number` by the settings store.
    #[serde(alias = "number")]
    pub weight: u32,
}

impl Category {
    pub fn new(id: u64, name: impl Into<String>, color: impl Into<String>, weight: u32) -> Self {
        Category {
            id: CategoryId::new(id),
            name: name.into(),
            color: color.into(),
            weight,
        }
    }
}

/// Ordered categories of one wheel. Order defines each category's slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelFace {
    /// Face key, e.g. "50" or "100".
    pub id: String,
    pub categories: Vec<Category>,
}

impl WheelFace {
    pub fn new(id: impl Into<String>, categories: Vec<Category>) -> Self {
        WheelFace {
            id: id.into(),
            categories,
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Phase of the spin state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpinPhase {
    #[default]
    Idle,
    /// Spinning, stop requests are not yet accepted.
    FastSpinning,
    /// Still spinning, a stop request commits the landing.
    AwaitingStop,
    /// Committed to a target, easing into the landing angle.
    Decelerating,
    /// Landed; winner known.
    Settled,
}

impl SpinPhase {
    pub fn is_spinning(&self) -> bool {
        matches!(self, SpinPhase::FastSpinning | SpinPhase::AwaitingStop)
    }

    pub fn accepts_stop(&self) -> bool {
        matches!(self, SpinPhase::AwaitingStop)
    }
}

/// Easing requested from the timing driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EasingType {
    Linear,
    Deceleration,
    EaseOut,
}

impl EasingType {
    /// CSS `transition-timing-function` equivalent.
    pub fn css(&self) -> &'static str {
        match self {
            EasingType::Linear => "linear",
            EasingType::Deceleration => "cubic-bezier(0.25, 0.46, 0.45, 0.94)",
            EasingType::EaseOut => "ease-out",
        }
    }
}

/// What a scheduled callback is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    FastSpinTick,
    MinimumDuration,
    AutoStop,
    DecelerationComplete,
    RevealBlink,
    RevealComplete,
}

/// Token handed to the driver with every scheduled callback and handed back when
/// it fires. The session tag makes late callbacks from a reset session inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerTicket {
    pub session: SessionId,
    pub kind: TimerKind,
}

impl TimerTicket {
    pub fn new(session: SessionId, kind: TimerKind) -> Self {
        TimerTicket { session, kind }
    }
}

/// Rotation request for the renderer: rotate the wheel element to `angle` over
/// `duration_ms`. `on_complete` is returned to the machine when it finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationAnimation {
    pub angle: Degrees,
    pub duration_ms: u64,
    pub easing: EasingType,
    #[serde(default)]
    pub on_complete: Option<TimerTicket>,
}

/// Notifications for the UI, drained after each interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WheelEvent {
    PhaseChanged {
        session: SessionId,
        phase: SpinPhase,
    },
    SpinComplete {
        session: SessionId,
        category: Category,
        final_angle: Degrees,
    },
    RevealBlink {
        session: SessionId,
        category_id: CategoryId,
        highlighted: bool,
    },
    WinnerRevealed {
        session: SessionId,
        category: Category,
    },
    InvariantViolation {
        session: SessionId,
        expected: CategoryId,
        resolved: CategoryId,
        angle: Degrees,
    },
}

/// Engine timing and landing settings. Every field has a default so partial
/// JSON from the settings store is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    /// Minimum fast-spin time before a stop is accepted.
    #[serde(default = "default_min_spin_ms")]
    pub min_spin_ms: u64,
    #[serde(default = "default_deceleration_ms")]
    pub deceleration_ms: u64,
    /// Fast-spin tick period; also the duration of each linear redraw.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_tick_increment_deg")]
    pub tick_increment_deg: f64,
    #[serde(default = "default_min_extra_turns")]
    pub min_extra_turns: u32,
    #[serde(default = "default_max_extra_turns")]
    pub max_extra_turns: u32,
    /// Fraction of a slice the landing point may fall in, measured from its start.
    #[serde(default = "default_landing_margin")]
    pub landing_margin: f64,
    #[serde(default = "default_reveal_ms")]
    pub reveal_ms: u64,
    #[serde(default = "default_reveal_blink_ms")]
    pub reveal_blink_ms: u64,
    /// Duration of the explicit reset-to-zero animation.
    #[serde(default = "default_snap_back_ms")]
    pub snap_back_ms: u64,
    /// Stop automatically this long after stopping becomes permitted.
    #[serde(default)]
    pub auto_stop_delay_ms: Option<u64>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_max_categories")]
    pub max_categories: usize,
}

fn default_min_spin_ms() -> u64 {
    3_000
}

fn default_deceleration_ms() -> u64 {
    2_000
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_tick_increment_deg() -> f64 {
    FULL_TURN
}

fn default_min_extra_turns() -> u32 {
    3
}

fn default_max_extra_turns() -> u32 {
    7
}

fn default_landing_margin() -> f64 {
    0.8
}

fn default_reveal_ms() -> u64 {
    3_000
}

fn default_reveal_blink_ms() -> u64 {
    500
}

fn default_snap_back_ms() -> u64 {
    500
}

fn default_history_limit() -> usize {
    50
}

fn default_max_categories() -> usize {
    50
}

impl Default for WheelConfig {
    fn default() -> Self {
        WheelConfig {
            min_spin_ms: default_min_spin_ms(),
            deceleration_ms: default_deceleration_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            tick_increment_deg: default_tick_increment_deg(),
            min_extra_turns: default_min_extra_turns(),
            max_extra_turns: default_max_extra_turns(),
            landing_margin: default_landing_margin(),
            reveal_ms: default_reveal_ms(),
            reveal_blink_ms: default_reveal_blink_ms(),
            snap_back_ms: default_snap_back_ms(),
            auto_stop_delay_ms: None,
            history_limit: default_history_limit(),
            max_categories: default_max_categories(),
        }
    }
}

impl WheelConfig {
    pub fn validate(&self) -> Result<(), WheelError> {
        if self.tick_interval_ms == 0 {
            return Err(WheelError::InvalidConfig(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.reveal_blink_ms == 0 {
            return Err(WheelError::InvalidConfig(
                "reveal_blink_ms must be positive".to_string(),
            ));
        }
        if !self.tick_increment_deg.is_finite() || self.tick_increment_deg <= 0.0 {
            return Err(WheelError::InvalidConfig(format!(
                "tick_increment_deg must be a positive angle, got {}",
                self.tick_increment_deg
            )));
        }
        // At least one extra turn keeps every landing ahead of the current rotation.
        if self.min_extra_turns == 0 {
            return Err(WheelError::InvalidConfig(
                "min_extra_turns must be at least 1".to_string(),
            ));
        }
        if self.min_extra_turns > self.max_extra_turns {
            return Err(WheelError::InvalidConfig(format!(
                "min_extra_turns ({}) exceeds max_extra_turns ({})",
                self.min_extra_turns, self.max_extra_turns
            )));
        }
        // NaN fails both comparisons.
        if !(self.landing_margin > 0.0 && self.landing_margin <= 1.0) {
            return Err(WheelError::InvalidConfig(format!(
                "landing_margin must be in (0, 1], got {}",
                self.landing_margin
            )));
        }
        if self.max_categories < 2 {
            return Err(WheelError::InvalidConfig(
                "max_categories must allow at least 2 categories".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read-only view of the machine for driving UI state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinSnapshot {
    pub session: SessionId,
    pub phase: SpinPhase,
    pub cumulative_rotation: Degrees,
    pub target_category_id: Option<CategoryId>,
    pub winner: Option<Category>,
    pub spin_started_at: Option<Timestamp>,
    pub can_stop: bool,
    /// Winner slice highlight state while the reveal blinks.
    pub highlighted: Option<CategoryId>,
    pub revealed: bool,
}

/// Engine construction payload from JS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub wheel: WheelConfig,
    /// Fixed seed for reproducible spins; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Everything JS needs after one interaction or animation frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub snapshot: SpinSnapshot,
    pub animations: Vec<RotationAnimation>,
    pub events: Vec<WheelEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.wheel, WheelConfig::default());
        assert_eq!(config.seed, None);

        let seeded: EngineConfig =
            serde_json::from_str(r#"{"wheel":{"min_spin_ms":500},"seed":42}"#).unwrap();
        assert_eq!(seeded.wheel.min_spin_ms, 500);
        assert_eq!(seeded.seed, Some(42));
    }

    #[test]
    fn timestamp_conversions() {
        let ts = Timestamp::from_millis(1_500);
        assert_eq!(ts.as_millis(), 1_500);
        assert!((ts.as_secs() - 1.5).abs() < 0.0001);
        assert_eq!(ts.after(500).millis_since(ts), 500);
        assert_eq!(ts.millis_since(ts.after(10)), 0);
    }

    #[test]
    fn js_millis_clamp() {
        assert_eq!(Timestamp::from_js_millis(-4.0).as_millis(), 0);
        assert_eq!(Timestamp::from_js_millis(f64::NAN).as_millis(), 0);
        assert_eq!(Timestamp::from_js_millis(1234.9).as_millis(), 1234);
    }

    #[test]
    fn degrees_normalize_into_one_turn() {
        assert_eq!(Degrees::new(725.0).normalized(), 5.0);
        assert_eq!(Degrees::new(-90.0).normalized(), 270.0);
        assert_eq!(Degrees::new(360.0).normalized(), 0.0);
        assert_eq!(Degrees::new(1000.0).whole_turns(), Degrees::new(720.0));
    }

    #[test]
    fn category_accepts_store_field_name() {
        let json = r##"{"id":9,"name":"$200","color":"#8A2BE2","number":1}"##;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.weight, 1);
        assert_eq!(category.id, CategoryId::new(9));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: WheelConfig = serde_json::from_str(r#"{"min_spin_ms":1000}"#).unwrap();
        assert_eq!(config.min_spin_ms, 1_000);
        assert_eq!(config.deceleration_ms, 2_000);
        assert_eq!(config.max_extra_turns, 7);
        assert_eq!(config.auto_stop_delay_ms, None);
    }

    #[test]
    fn config_validation() {
        assert!(WheelConfig::default().validate().is_ok());

        let bad_turns = WheelConfig {
            min_extra_turns: 8,
            ..Default::default()
        };
        assert!(matches!(
            bad_turns.validate(),
            Err(WheelError::InvalidConfig(_))
        ));

        for margin in [0.0, 1.5, f64::NAN] {
            let config = WheelConfig {
                landing_margin: margin,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "margin {} accepted", margin);
        }

        let no_tick = WheelConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(no_tick.validate().is_err());
    }

    #[test]
    fn easing_maps_to_css_timing_functions() {
        assert_eq!(EasingType::Linear.css(), "linear");
        assert_eq!(
            EasingType::Deceleration.css(),
            "cubic-bezier(0.25, 0.46, 0.45, 0.94)"
        );
        assert_eq!(EasingType::EaseOut.css(), "ease-out");
    }

    #[test]
    fn phase_predicates() {
        assert!(SpinPhase::FastSpinning.is_spinning());
        assert!(!SpinPhase::FastSpinning.accepts_stop());
        assert!(SpinPhase::AwaitingStop.accepts_stop());
        assert!(!SpinPhase::Settled.is_spinning());
    }
}
