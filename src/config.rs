use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::remote::DEFAULT_PORT;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// ウィンドウ幅
    #[serde(default = "default_width")]
    pub width: usize,
    /// ウィンドウ高さ
    #[serde(default = "default_height")]
    pub height: usize,
    /// 描画FPS上限
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    /// 外部コントローラーからのポーズ受信を有効化
    #[serde(default)]
    pub enabled: bool,
    /// UDP待ち受けポート
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_width() -> usize {
    960
}
fn default_height() -> usize {
    540
}
fn default_target_fps() -> u32 {
    60
}
fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            target_fps: default_target_fps(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_port(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルが読めなければデフォルト設定で続行
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "{} を読めませんでした ({}) - デフォルト設定を使用します",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }
}
