use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// クォータニオンの最小ノルム二乗
/// これ未満は回転として復元できないため拒否する
const MIN_QUAT_NORM_SQ: f64 = 1e-12;

/// カメラの位置と回転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// 位置 (x, y, z)
    pub position: [f64; 3],
    /// 回転 (クォータニオン: w, x, y, z)
    pub rotation: [f64; 4],
}

impl Pose {
    pub fn new(position: [f64; 3], rotation: [f64; 4]) -> Self {
        Self { position, rotation }
    }

    /// 原点、回転なし
    pub fn identity() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

// --- ワイヤフォーマット (1データグラム = 1メッセージ, UTF-8 JSON) ---
// {"position":{"x":..,"y":..,"z":..},"rotation":{"w":..,"x":..,"y":..,"z":..}}

#[derive(Debug, Deserialize)]
struct PositionMsg {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Deserialize)]
struct RotationMsg {
    w: f64,
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Deserialize)]
struct PoseMsg {
    position: PositionMsg,
    rotation: RotationMsg,
}

/// 受信ペイロードをPoseにデコード
///
/// フィールド欠落・型不一致・途中で切れたJSONはすべてエラー。
/// 未知のフィールドは無視する。非有限値とゼロクォータニオンは拒否。
pub fn decode(payload: &[u8]) -> Result<Pose> {
    let text = std::str::from_utf8(payload).context("payload is not valid UTF-8")?;
    let msg: PoseMsg = serde_json::from_str(text).context("invalid pose message")?;

    let pose = Pose::new(
        [msg.position.x, msg.position.y, msg.position.z],
        [msg.rotation.w, msg.rotation.x, msg.rotation.y, msg.rotation.z],
    );

    if !pose.position.iter().all(|v| v.is_finite()) || !pose.rotation.iter().all(|v| v.is_finite())
    {
        bail!("pose contains non-finite values");
    }

    let norm_sq: f64 = pose.rotation.iter().map(|v| v * v).sum();
    if norm_sq < MIN_QUAT_NORM_SQ {
        bail!("rotation quaternion is (near) zero");
    }

    Ok(pose)
}
