//! 基準シーンのワイヤーフレーム描画
//!
//! 床グリッド・座標軸・立方体を描く。適用されたカメラポーズを
//! 目視確認するためのもので、本来のシーンレンダラーの代役。

use nalgebra::{Matrix4, Point3};

use crate::camera::OrbitCamera;
use crate::render::window::MinifbRenderer;

pub const BACKGROUND_COLOR: u32 = 0x0010_1018;
const GRID_COLOR: u32 = 0x0030_3040;
const AXIS_X_COLOR: u32 = 0x00e0_5050;
const AXIS_Y_COLOR: u32 = 0x0050_e050;
const AXIS_Z_COLOR: u32 = 0x0050_80e0;
const CUBE_COLOR: u32 = 0x00d0_d0d0;

const GRID_HALF_EXTENT: i32 = 5;

/// NDCがこれを超える線分は捨てる（画面外の巨大座標対策）
const NDC_CULL_LIMIT: f32 = 8.0;

/// 基準シーンを描画
pub fn draw_reference_scene(renderer: &mut MinifbRenderer, camera: &OrbitCamera) {
    let view_proj = camera.projection_matrix() * camera.view_matrix();

    // 床グリッド (y = 0)
    let e = GRID_HALF_EXTENT as f32;
    for i in -GRID_HALF_EXTENT..=GRID_HALF_EXTENT {
        let t = i as f32;
        draw_segment(
            renderer,
            &view_proj,
            Point3::new(t, 0.0, -e),
            Point3::new(t, 0.0, e),
            GRID_COLOR,
        );
        draw_segment(
            renderer,
            &view_proj,
            Point3::new(-e, 0.0, t),
            Point3::new(e, 0.0, t),
            GRID_COLOR,
        );
    }

    // 座標軸
    let origin = Point3::origin();
    draw_segment(renderer, &view_proj, origin, Point3::new(1.5, 0.0, 0.0), AXIS_X_COLOR);
    draw_segment(renderer, &view_proj, origin, Point3::new(0.0, 1.5, 0.0), AXIS_Y_COLOR);
    draw_segment(renderer, &view_proj, origin, Point3::new(0.0, 0.0, 1.5), AXIS_Z_COLOR);

    // 原点上の立方体 (一辺1, y: 0..1)
    let corners = [
        Point3::new(-0.5, 0.0, -0.5),
        Point3::new(0.5, 0.0, -0.5),
        Point3::new(0.5, 0.0, 0.5),
        Point3::new(-0.5, 0.0, 0.5),
        Point3::new(-0.5, 1.0, -0.5),
        Point3::new(0.5, 1.0, -0.5),
        Point3::new(0.5, 1.0, 0.5),
        Point3::new(-0.5, 1.0, 0.5),
    ];
    const EDGES: [(usize, usize); 12] = [
        (0, 1), (1, 2), (2, 3), (3, 0), // 底面
        (4, 5), (5, 6), (6, 7), (7, 4), // 上面
        (0, 4), (1, 5), (2, 6), (3, 7), // 柱
    ];
    for (a, b) in EDGES {
        draw_segment(renderer, &view_proj, corners[a], corners[b], CUBE_COLOR);
    }
}

fn draw_segment(
    renderer: &mut MinifbRenderer,
    view_proj: &Matrix4<f32>,
    a: Point3<f32>,
    b: Point3<f32>,
    color: u32,
) {
    let (width, height) = (renderer.width(), renderer.height());
    let pa = project(view_proj, a, width, height);
    let pb = project(view_proj, b, width, height);
    if let (Some((x0, y0)), Some((x1, y1))) = (pa, pb) {
        renderer.draw_line(x0, y0, x1, y1, color);
    }
}

/// ワールド座標をピクセル座標に射影
///
/// カメラの背後にある点、NDCが大きく外れた点はNone。
fn project(
    view_proj: &Matrix4<f32>,
    point: Point3<f32>,
    width: usize,
    height: usize,
) -> Option<(i32, i32)> {
    let clip = view_proj * point.to_homogeneous();
    if clip.w <= 1e-4 {
        return None;
    }
    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    if ndc_x.abs() > NDC_CULL_LIMIT || ndc_y.abs() > NDC_CULL_LIMIT {
        return None;
    }

    let px = ((ndc_x * 0.5 + 0.5) * width as f32) as i32;
    let py = ((1.0 - (ndc_y * 0.5 + 0.5)) * height as f32) as i32;
    Some((px, py))
}
