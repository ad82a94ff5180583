//! Motion-gate binary: runs the engine against a real camera and logs
//! motion edges, standing in for the kiosk view layer.
//!
//! Configuration via environment variables:
//! - `MOTION_GATE_DEVICE`: /dev/video index (default: first capture-capable
//!   device)
//! - `MOTION_GATE_SENSITIVITY`: 1-100 (default 80)
//! - `MOTION_GATE_FPS`: tick rate (default 60)

use motion_gate::{
    Format, FourCC, MotionEngine, MotionEvent, Sensitivity, V4L2Provider,
};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let provider = env_u32("MOTION_GATE_DEVICE").map_or_else(V4L2Provider::auto, V4L2Provider::new);

    #[allow(clippy::cast_possible_truncation)]
    let sensitivity = Sensitivity::new(env_u32("MOTION_GATE_SENSITIVITY").unwrap_or(80).min(255) as u8);
    let fps = env_u32("MOTION_GATE_FPS").unwrap_or(60).max(1);
    let frame_budget = Duration::from_millis(u64::from(1000 / fps));

    let (events_tx, events_rx) = channel();
    let mut engine = MotionEngine::new(
        provider,
        Format::new(1280, 720, FourCC::YUYV),
        sensitivity,
        events_tx,
    );

    engine.enable();

    if let Some(info) = engine.session_info() {
        println!("Device: {}", info.card);
        println!("Driver: {}", info.driver);
        println!("Format: {}x{} {:?}", info.format.width, info.format.height, info.format.fourcc);
        println!("Sensitivity: {}", engine.sensitivity().get());
    }

    loop {
        let tick_start = Instant::now();
        engine.tick(tick_start);

        while let Ok(event) = events_rx.try_recv() {
            match event {
                MotionEvent::MotionStarted => println!("motion started"),
                MotionEvent::MotionEnded => println!("motion ended"),
                MotionEvent::CameraError(err) => return Err(Box::new(err)),
            }
        }

        let elapsed = tick_start.elapsed();
        if elapsed < frame_budget {
            std::thread::sleep(frame_budget - elapsed);
        }
    }
}
