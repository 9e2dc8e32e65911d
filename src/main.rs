use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use splatview::camera::{CameraHandler, OrbitCamera};
use splatview::config::Config;
use splatview::remote::{PoseListener, PoseSlot};
use splatview::render::{scene, Key, MinifbRenderer};

const CONFIG_PATH: &str = "config.toml";

/// 1フレームあたりの旋回量（ラジアン）
const ORBIT_STEP: f32 = 0.03;
const ZOOM_STEP: f32 = 0.1;

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Splatview {} ===", env!("GIT_VERSION"));
    println!(
        "Window: {}x{} @ {}fps",
        config.app.width, config.app.height, config.app.target_fps
    );
    if config.remote.enabled {
        println!("Remote control: UDP port {}", config.remote.port);
    } else {
        println!("Remote control: OFF");
    }

    let mut renderer = MinifbRenderer::new("Splatview", config.app.width, config.app.height)?;
    let aspect = config.app.width as f32 / config.app.height as f32;
    let mut camera = OrbitCamera::new(aspect);

    let slot = Arc::new(PoseSlot::new());
    let listener = if config.remote.enabled {
        let listener = PoseListener::start(config.remote.port, slot.clone())?;
        println!("Listening on {}", listener.local_addr());
        // 受信ポーズが同フレームのローカル入力で上書きされないよう、
        // 起動時に一度だけ外部制御モードへ切り替える
        camera.set_external_mode(true);
        Some(listener)
    } else {
        None
    };

    if config.remote.enabled {
        println!("操作: [Esc] 終了 (カメラは外部制御)");
    } else {
        println!("操作: [←→↑↓] 旋回  [W/S] ズーム  [Esc] 終了");
    }

    let frame_duration = Duration::from_secs_f64(1.0 / config.app.target_fps as f64);

    while renderer.is_open() {
        let frame_start = Instant::now();

        // ローカルナビゲーション（外部制御中はカメラ側で無視される）
        if renderer.is_key_down(Key::Left) {
            camera.orbit(-ORBIT_STEP, 0.0);
        }
        if renderer.is_key_down(Key::Right) {
            camera.orbit(ORBIT_STEP, 0.0);
        }
        if renderer.is_key_down(Key::Up) {
            camera.orbit(0.0, ORBIT_STEP);
        }
        if renderer.is_key_down(Key::Down) {
            camera.orbit(0.0, -ORBIT_STEP);
        }
        if renderer.is_key_down(Key::W) {
            camera.zoom(-ZOOM_STEP);
        }
        if renderer.is_key_down(Key::S) {
            camera.zoom(ZOOM_STEP);
        }

        // 未消費の受信ポーズがあれば適用（ロックの外で）
        if let Some(pose) = slot.take() {
            camera.apply_pose(&pose);
        }

        scene_frame(&mut renderer, &camera)?;

        // FPS上限制御（spin wait for precision）
        while frame_start.elapsed() < frame_duration {
            std::hint::spin_loop();
        }
    }

    if let Some(listener) = listener {
        listener.stop();
    }
    println!("Shutting down...");
    Ok(())
}

fn scene_frame(renderer: &mut MinifbRenderer, camera: &OrbitCamera) -> Result<()> {
    renderer.clear(scene::BACKGROUND_COLOR);
    scene::draw_reference_scene(renderer, camera);
    renderer.update()
}
