use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Quaternion, UnitQuaternion, Vector3};

use crate::pose::Pose;

/// ピッチの可動域（真上・真下の手前まで）
const PITCH_LIMIT: f32 = 1.5;
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 50.0;

/// 外部からポーズを適用できるカメラのインターフェース
///
/// 外部制御モード中はローカル入力によるナビゲーションを無視する。
/// モード切り替えはサブシステム起動時の一回だけ行われる。
pub trait CameraHandler {
    fn apply_pose(&mut self, pose: &Pose);
    fn set_external_mode(&mut self, enabled: bool);
}

/// ビューアの対話カメラ（ターゲット周回 + ズーム）
pub struct OrbitCamera {
    target: Point3<f32>,
    yaw: f32,
    pitch: f32,
    distance: f32,

    position: Point3<f32>,
    orientation: UnitQuaternion<f32>,
    external: bool,

    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        let mut camera = Self {
            target: Point3::origin(),
            yaw: 0.6,
            pitch: -0.4,
            distance: 6.0,
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            external: false,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect,
            near: 0.1,
            far: 100.0,
        };
        camera.update_from_orbit();
        camera
    }

    /// ターゲット周りの旋回。外部制御中は無視。
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        if self.external {
            return;
        }
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_from_orbit();
    }

    /// ターゲットへの接近・後退。外部制御中は無視。
    pub fn zoom(&mut self, delta: f32) {
        if self.external {
            return;
        }
        self.distance = (self.distance + delta).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.update_from_orbit();
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    /// ワールド→カメラ変換
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Isometry3::from_parts(self.position.coords.into(), self.orientation)
            .inverse()
            .to_homogeneous()
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Perspective3::new(self.aspect, self.fov_y, self.near, self.far).into_inner()
    }

    /// 周回パラメータから位置・向きを再計算
    ///
    /// カメラはローカル-Z方向を向く。ヨー（Y軸）→ピッチ（X軸）の順。
    fn update_from_orbit(&mut self) {
        self.orientation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.pitch);
        let forward = self.orientation * -Vector3::z();
        self.position = self.target - forward * self.distance;
    }
}

impl CameraHandler for OrbitCamera {
    /// 受信ポーズで位置・向きを上書きする
    ///
    /// クォータニオンはここで正規化する（送信側に単位ノルムは要求しない）。
    fn apply_pose(&mut self, pose: &Pose) {
        self.position = Point3::new(
            pose.position[0] as f32,
            pose.position[1] as f32,
            pose.position[2] as f32,
        );
        self.orientation = UnitQuaternion::from_quaternion(Quaternion::new(
            pose.rotation[0] as f32,
            pose.rotation[1] as f32,
            pose.rotation[2] as f32,
            pose.rotation[3] as f32,
        ));
    }

    fn set_external_mode(&mut self, enabled: bool) {
        self.external = enabled;
    }
}
