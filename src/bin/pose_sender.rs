//! Test controller: sends JSON pose datagrams to a running viewer.

use anyhow::Result;
use serde_json::json;
use std::io::{self, Write};
use std::net::UdpSocket;

use splatview::pose::Pose;
use splatview::remote::DEFAULT_PORT;

fn main() -> Result<()> {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("127.0.0.1:{}", DEFAULT_PORT));

    println!("=== Splatview - Pose Sender ===");
    println!("送信先: {}", target);
    println!();
    println!("コマンド:");
    println!("  p x y z       - 位置を設定して送信 (例: p 0 1 5)");
    println!("  r w x y z     - 回転を設定して送信 (例: r 1 0 0 0)");
    println!("  s             - 現在の値を送信");
    println!("  o             - テスト送信 (原点の周りを一周)");
    println!("  q             - 終了");
    println!();

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    let mut pose = Pose::new([0.0, 1.0, 5.0], [1.0, 0.0, 0.0, 0.0]);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "p" if parts.len() == 4 => {
                let x: f64 = parts[1].parse()?;
                let y: f64 = parts[2].parse()?;
                let z: f64 = parts[3].parse()?;
                pose.position = [x, y, z];
                println!("位置: [{}, {}, {}]", x, y, z);
                send_pose(&socket, &target, &pose)?;
                println!("送信しました");
            }
            "r" if parts.len() == 5 => {
                let w: f64 = parts[1].parse()?;
                let x: f64 = parts[2].parse()?;
                let y: f64 = parts[3].parse()?;
                let z: f64 = parts[4].parse()?;
                pose.rotation = [w, x, y, z];
                println!("回転: [{}, {}, {}, {}]", w, x, y, z);
                send_pose(&socket, &target, &pose)?;
                println!("送信しました");
            }
            "s" => {
                println!("現在の値:");
                println!("  位置: {:?}", pose.position);
                println!("  回転: {:?}", pose.rotation);
                send_pose(&socket, &target, &pose)?;
                println!("送信しました");
            }
            "o" => {
                println!("テスト送信中...");
                let radius = 5.0f64;
                let steps = 120;
                for i in 0..steps {
                    let angle = i as f64 / steps as f64 * std::f64::consts::TAU;
                    // 原点を向いたまま周回するカメラポーズ
                    let half = angle / 2.0;
                    pose.position = [radius * angle.sin(), 1.0, radius * angle.cos()];
                    pose.rotation = [half.cos(), 0.0, half.sin(), 0.0];
                    send_pose(&socket, &target, &pose)?;
                    std::thread::sleep(std::time::Duration::from_millis(33));
                }
                println!("テスト完了");
            }
            "q" => {
                println!("終了します");
                break;
            }
            _ => {
                println!("不明なコマンド: {}", parts[0]);
            }
        }
    }

    Ok(())
}

/// ビューアのワイヤフォーマットでポーズを1データグラム送信
fn send_pose(socket: &UdpSocket, target: &str, pose: &Pose) -> Result<()> {
    let msg = json!({
        "position": {
            "x": pose.position[0],
            "y": pose.position[1],
            "z": pose.position[2],
        },
        "rotation": {
            "w": pose.rotation[0],
            "x": pose.rotation[1],
            "y": pose.rotation[2],
            "z": pose.rotation[3],
        },
    });
    socket.send_to(msg.to_string().as_bytes(), target)?;
    Ok(())
}
