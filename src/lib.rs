// wheel_core: prize wheel Rust/WASM engine
// Winner selection, landing math, and the spin state machine live here; JS only
// renders rotations, forwards input, and supplies the clock.

mod category;
mod driver;
mod error;
mod history;
mod machine;
mod resolver;
mod rng;
mod rotation;
mod selector;
mod types;

use wasm_bindgen::prelude::*;

pub use category::{MAX_NAME_CHARS, MAX_WEIGHT, MIN_CATEGORIES, MIN_WEIGHT, RESERVED_WEIGHT};
pub use driver::{CancelToken, TimerQueue, TimingDriver};
pub use error::{ValidationError, WheelError};
pub use history::{HistoryEntry, SpinHistory};
pub use machine::SpinMachine;
pub use resolver::{pointer_angle, resolve_category, resolve_index, verify_landing};
pub use rng::{RandomSource, SeededRandom, SystemRandom};
pub use rotation::{compute_target_rotation, plan_landing, LandingParams, LandingPlan, MAX_REROLLS};
pub use selector::{eligible, select_winner};
pub use types::*;

/// Install the panic hook and console logger.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(target_arch = "wasm32")]
    wasm_logger::init(wasm_logger::Config::default());
}

/// Wheel engine exposed to JavaScript.
/// Every mutating call first advances the timer queue to `now_ms` and returns a
/// `Frame` JSON, so JS makes one crossing per interaction or animation frame.
#[wasm_bindgen]
pub struct WheelEngine {
    machine: SpinMachine<TimerQueue>,
}

#[wasm_bindgen]
impl WheelEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WheelEngine, JsValue> {
        WheelEngine::from_config_json(config_json).map_err(to_js)
    }

    pub fn start_spin(&mut self, face_json: &str, now_ms: f64) -> Result<String, JsValue> {
        let face = parse_face(face_json).map_err(to_js)?;
        self.frame_json(now_ms, |m| m.start_spin(&face))
    }

    pub fn request_stop(&mut self, now_ms: f64) -> Result<String, JsValue> {
        self.frame_json(now_ms, |m| {
            m.request_stop();
            Ok(())
        })
    }

    /// Enter-key action: start, stop, or close the revealed result.
    pub fn activate(&mut self, face_json: &str, now_ms: f64) -> Result<String, JsValue> {
        let face = parse_face(face_json).map_err(to_js)?;
        self.frame_json(now_ms, |m| m.activate(&face))
    }

    pub fn reset_wheel(&mut self, now_ms: f64) -> Result<String, JsValue> {
        self.frame_json(now_ms, |m| {
            m.reset_wheel();
            Ok(())
        })
    }

    pub fn reset_rotation(&mut self, now_ms: f64) -> Result<String, JsValue> {
        self.frame_json(now_ms, |m| {
            m.reset_rotation();
            Ok(())
        })
    }

    /// Fire due timers. Call from the animation frame loop.
    pub fn advance(&mut self, now_ms: f64) -> Result<String, JsValue> {
        self.frame_json(now_ms, |_| Ok(()))
    }

    /// Host time of the next pending timer, if any.
    pub fn next_due_ms(&self) -> Option<f64> {
        self.machine
            .driver()
            .next_due()
            .map(|due| due.as_millis() as f64)
    }

    pub fn snapshot(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.machine.snapshot())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Settled spins, newest first.
    pub fn history(&self) -> Result<String, JsValue> {
        let entries: Vec<&HistoryEntry> = self.machine.history().iter().collect();
        serde_json::to_string(&entries)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn remove_history_entry(&mut self, index: usize) -> bool {
        self.machine.history_mut().remove(index).is_some()
    }

    pub fn clear_history(&mut self) {
        self.machine.history_mut().clear();
    }
}

impl WheelEngine {
    pub fn from_config_json(config_json: &str) -> Result<Self, WheelError> {
        let config: EngineConfig = serde_json::from_str(config_json)
            .map_err(|e| WheelError::InvalidConfig(e.to_string()))?;

        let rng: Box<dyn RandomSource> = match config.seed {
            Some(seed) => Box::new(SeededRandom::new(seed)),
            None => Box::new(SystemRandom::new()),
        };
        log::info!("wheel engine ready (seeded: {})", config.seed.is_some());

        Ok(WheelEngine {
            machine: SpinMachine::new(config.wheel, TimerQueue::new(), rng)?,
        })
    }

    /// Advance to `now`, apply `action`, and collect what the renderer needs.
    pub fn step<F>(&mut self, now: Timestamp, action: F) -> Result<Frame, WheelError>
    where
        F: FnOnce(&mut SpinMachine<TimerQueue>) -> Result<(), WheelError>,
    {
        self.machine.advance_to(now);
        action(&mut self.machine)?;
        Ok(self.frame())
    }

    pub fn machine(&self) -> &SpinMachine<TimerQueue> {
        &self.machine
    }

    fn frame(&mut self) -> Frame {
        Frame {
            snapshot: self.machine.snapshot(),
            animations: self.machine.driver_mut().take_animations(),
            events: self.machine.take_events(),
        }
    }

    fn frame_json<F>(&mut self, now_ms: f64, action: F) -> Result<String, JsValue>
    where
        F: FnOnce(&mut SpinMachine<TimerQueue>) -> Result<(), WheelError>,
    {
        let frame = self
            .step(Timestamp::from_js_millis(now_ms), action)
            .map_err(to_js)?;
        serde_json::to_string(&frame).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

fn parse_face(face_json: &str) -> Result<WheelFace, WheelError> {
    Ok(serde_json::from_str(face_json)?)
}

fn to_js(err: WheelError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACE: &str = r##"{"id":"50","categories":[
        {"id":1,"name":"$200","color":"#8A2BE2","number":1},
        {"id":2,"name":"$5","color":"#FFD700","number":50},
        {"id":3,"name":"Parle G 10Pcs","color":"#228B22","number":90}
    ]}"##;

    fn engine() -> WheelEngine {
        WheelEngine::from_config_json(r#"{"seed":7}"#).unwrap()
    }

    #[test]
    fn engine_creation_works() {
        assert!(WheelEngine::new(r#"{"wheel":{},"seed":1}"#).is_ok());
        assert!(WheelEngine::new("{}").is_ok());
    }

    #[test]
    fn bad_config_is_rejected() {
        assert!(matches!(
            WheelEngine::from_config_json("not json"),
            Err(WheelError::InvalidConfig(_))
        ));
        assert!(matches!(
            WheelEngine::from_config_json(r#"{"wheel":{"landing_margin":2.0}}"#),
            Err(WheelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn face_json_uses_store_format() {
        let face = parse_face(FACE).unwrap();
        assert_eq!(face.len(), 3);
        assert_eq!(face.categories[0].weight, 1);
        assert!(matches!(parse_face("not a face"), Err(WheelError::Serialization(_))));
    }

    #[test]
    fn session_through_json_facade() {
        let mut engine = engine();

        let started: Frame = serde_json::from_str(&engine.start_spin(FACE, 1_000.0).unwrap()).unwrap();
        assert_eq!(started.snapshot.phase, SpinPhase::FastSpinning);
        assert_eq!(started.animations.len(), 1);
        assert_eq!(engine.next_due_ms(), Some(1_100.0));

        let awaiting: Frame = serde_json::from_str(&engine.advance(4_000.0).unwrap()).unwrap();
        assert!(awaiting.snapshot.can_stop);

        let stopping: Frame = serde_json::from_str(&engine.request_stop(4_000.0).unwrap()).unwrap();
        assert_eq!(stopping.snapshot.phase, SpinPhase::Decelerating);
        let landing = stopping.animations.last().unwrap();
        assert_eq!(landing.easing, EasingType::Deceleration);
        assert!(landing.on_complete.is_some());

        let settled: Frame = serde_json::from_str(&engine.advance(6_000.0).unwrap()).unwrap();
        assert_eq!(settled.snapshot.phase, SpinPhase::Settled);
        let winner = settled.snapshot.winner.clone().unwrap();
        assert_eq!(Some(winner.id), stopping.snapshot.target_category_id);
        assert!(settled
            .events
            .iter()
            .any(|e| matches!(e, WheelEvent::SpinComplete { .. })));

        let history: Vec<HistoryEntry> = serde_json::from_str(&engine.history().unwrap()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].category, winner);

        assert!(engine.remove_history_entry(0));
        assert!(!engine.remove_history_entry(0));
    }

    #[test]
    fn resumed_tab_gets_a_small_frame() {
        let mut engine = engine();
        engine.start_spin(FACE, 0.0).unwrap();
        engine.advance(3_000.0).unwrap();

        let resumed: Frame = serde_json::from_str(&engine.advance(3_603_000.0).unwrap()).unwrap();
        assert!(resumed.animations.len() <= 2);
        assert_eq!(resumed.snapshot.phase, SpinPhase::AwaitingStop);
        assert_eq!(engine.next_due_ms(), Some(3_603_100.0));
    }

    #[test]
    fn invalid_face_reports_error_and_stays_idle() {
        let mut engine = engine();
        let lonely = parse_face(r#"{"id":"50","categories":[{"id":1,"name":"$5","weight":50}]}"#).unwrap();

        let result = engine.step(Timestamp::from_millis(0), |m| m.start_spin(&lonely));
        assert!(matches!(
            result,
            Err(WheelError::Validation(ValidationError::TooFewCategories { .. }))
        ));
        assert_eq!(engine.machine().phase(), SpinPhase::Idle);
    }

    #[test]
    fn enter_key_cycle() {
        let mut engine = engine();
        engine.activate(FACE, 0.0).unwrap();
        engine.advance(3_000.0).unwrap();
        engine.activate(FACE, 3_000.0).unwrap();
        engine.advance(8_000.0).unwrap();
        assert!(engine.machine().is_revealed());

        let closed: Frame = serde_json::from_str(&engine.activate(FACE, 8_000.0).unwrap()).unwrap();
        assert_eq!(closed.snapshot.phase, SpinPhase::Idle);

        let snapped: Frame = serde_json::from_str(&engine.reset_rotation(8_100.0).unwrap()).unwrap();
        assert_eq!(snapped.snapshot.cumulative_rotation, Degrees::ZERO);
        assert_eq!(snapped.animations[0].easing, EasingType::EaseOut);

        engine.clear_history();
        assert_eq!(engine.history().unwrap(), "[]");
    }
}
