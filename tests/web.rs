// Browser smoke test: the engine runs a full session through the JSON facade.
#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;
use wheel_core::{Frame, SpinPhase, WheelEngine};

wasm_bindgen_test_configure!(run_in_browser);

const FACE: &str = r##"{"id":"100","categories":[
    {"id":1,"name":"$200","color":"#8A2BE2","number":1},
    {"id":2,"name":"$5","color":"#FFD700","number":50}
]}"##;

fn frame(json: String) -> Frame {
    serde_json::from_str(&json).unwrap()
}

#[wasm_bindgen_test]
fn spin_settles_on_regular_prize() {
    let mut engine = WheelEngine::new(r#"{"seed":3}"#).unwrap();

    assert_eq!(frame(engine.start_spin(FACE, 0.0).unwrap()).snapshot.phase, SpinPhase::FastSpinning);
    assert!(frame(engine.advance(3_000.0).unwrap()).snapshot.can_stop);
    frame(engine.request_stop(3_000.0).unwrap());

    let settled = frame(engine.advance(5_000.0).unwrap());
    assert_eq!(settled.snapshot.phase, SpinPhase::Settled);
    assert_eq!(settled.snapshot.winner.unwrap().name, "$5");
}

#[wasm_bindgen_test]
fn single_category_face_is_rejected() {
    let mut engine = WheelEngine::new(r#"{"seed":3}"#).unwrap();
    let lonely = r#"{"id":"50","categories":[{"id":1,"name":"$5","number":50}]}"#;

    assert!(engine.start_spin(lonely, 0.0).is_err());
    assert_eq!(frame(engine.advance(10.0).unwrap()).snapshot.phase, SpinPhase::Idle);
}
