use anyhow::{Context, Result};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::pose;
use crate::remote::slot::PoseSlot;

/// 既定の待ち受けポート
pub const DEFAULT_PORT: u16 = 4444;

/// 受信バッファサイズ。これを超えるデータグラムは切り捨てられ、
/// デコード失敗として破棄される
const RECV_BUF_SIZE: usize = 1024;

/// 受信タイムアウト。停止要求はこの間隔以内に観測される
const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// 不正メッセージのログ上限（1秒あたり）
const MALFORM_LOG_BUDGET: u32 = 4;

/// ログに載せるペイロードプレビューの最大長
const PAYLOAD_PREVIEW_LEN: usize = 96;

/// UDPポーズリスナー
///
/// 専用スレッドでデータグラムを受信し、デコードできたポーズを
/// 共有スロットへ公開する。不正なパケットは落として続行する。
pub struct PoseListener {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl PoseListener {
    /// 指定ポートにバインドして受信スレッドを開始する
    ///
    /// バインド失敗はサブシステム起動の失敗としてそのまま返す
    /// （リトライしない）。port 0 でエフェメラルポートに束縛できる。
    pub fn start(port: u16, slot: Arc<PoseSlot>) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .with_context(|| format!("failed to bind UDP port {}", port))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .context("failed to set receive timeout")?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let running_ref = running.clone();
        let handle = thread::spawn(move || receive_loop(socket, slot, running_ref));

        Ok(Self {
            running,
            handle: Some(handle),
            local_addr,
        })
    }

    /// 実際に束縛されたアドレス
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 停止を要求し、受信スレッドの終了を待つ。
    /// 受信タイムアウト1回分以内に復帰する。
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PoseListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn receive_loop(socket: UdpSocket, slot: Arc<PoseSlot>, running: Arc<AtomicBool>) {
    let mut buf = [0u8; RECV_BUF_SIZE];
    let mut malform_log = MalformLog::new(MALFORM_LOG_BUDGET);

    while running.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, _sender)) => match pose::decode(&buf[..len]) {
                Ok(pose) => slot.publish(pose),
                Err(e) => malform_log.report(&e, &buf[..len]),
            },
            // タイムアウトはrunningフラグの再チェック機会
            Err(e) if is_timeout(&e) => continue,
            Err(e) => eprintln!("pose receive error: {}", e),
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// 不正メッセージ用のレート制限付きロガー
///
/// 1秒ウィンドウあたりbudget件まで報告し、超過分は件数だけ集計して
/// 次のウィンドウ頭でまとめて報告する。敵対的な送信元にstderrを
/// 埋め尽くされないようにする。
struct MalformLog {
    budget: u32,
    window_start: Instant,
    reported: u32,
    suppressed: u64,
}

impl MalformLog {
    fn new(budget: u32) -> Self {
        Self {
            budget,
            window_start: Instant::now(),
            reported: 0,
            suppressed: 0,
        }
    }

    fn report(&mut self, error: &anyhow::Error, payload: &[u8]) {
        if self.record(Instant::now()) {
            eprintln!(
                "dropped malformed pose message ({:#}): {}",
                error,
                payload_preview(payload)
            );
        }
    }

    /// 今ログを出してよいならtrue。ウィンドウの繰り越し処理もここで行う。
    fn record(&mut self, now: Instant) -> bool {
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            if self.suppressed > 0 {
                eprintln!(
                    "dropped {} more malformed pose messages (rate limited)",
                    self.suppressed
                );
            }
            self.window_start = now;
            self.reported = 0;
            self.suppressed = 0;
        }

        if self.reported < self.budget {
            self.reported += 1;
            true
        } else {
            self.suppressed += 1;
            false
        }
    }
}

fn payload_preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    let mut preview: String = text.chars().take(PAYLOAD_PREVIEW_LEN).collect();
    if preview.len() < text.len() {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    /// テスト用の送信ソケット
    fn sender() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").unwrap()
    }

    /// スロットに更新が来るまでポーリング
    fn wait_for_pose(slot: &PoseSlot, deadline: Duration) -> Option<Pose> {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if let Some(pose) = slot.take() {
                return Some(pose);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_valid_message_reaches_slot() {
        let slot = Arc::new(PoseSlot::new());
        let listener = PoseListener::start(0, slot.clone()).unwrap();
        let addr = listener.local_addr();

        let tx = sender();
        tx.send_to(
            br#"{"position":{"x":1,"y":2,"z":3},"rotation":{"w":1,"x":0,"y":0,"z":0}}"#,
            addr,
        )
        .unwrap();

        let pose = wait_for_pose(&slot, Duration::from_secs(2)).expect("pose not received");
        assert_eq!(pose.position, [1.0, 2.0, 3.0]);
        assert_eq!(pose.rotation, [1.0, 0.0, 0.0, 0.0]);

        // 追加のメッセージがなければ更新なし
        assert!(slot.take().is_none());

        listener.stop();
    }

    #[test]
    fn test_malformed_message_leaves_slot_untouched() {
        let slot = Arc::new(PoseSlot::new());
        let listener = PoseListener::start(0, slot.clone()).unwrap();
        let addr = listener.local_addr();

        let tx = sender();
        tx.send_to(br#"{"position":{"x":1}}"#, addr).unwrap();

        // 不正パケットはスロットに現れない
        assert!(wait_for_pose(&slot, Duration::from_millis(300)).is_none());

        // リスナーは生きていて、次の正しいメッセージは届く
        tx.send_to(
            br#"{"position":{"x":4,"y":5,"z":6},"rotation":{"w":0,"x":0,"y":1,"z":0}}"#,
            addr,
        )
        .unwrap();
        let pose = wait_for_pose(&slot, Duration::from_secs(2)).expect("pose not received");
        assert_eq!(pose.position, [4.0, 5.0, 6.0]);

        listener.stop();
    }

    #[test]
    fn test_burst_last_write_wins() {
        let slot = Arc::new(PoseSlot::new());
        let listener = PoseListener::start(0, slot.clone()).unwrap();
        let addr = listener.local_addr();

        let tx = sender();
        for i in 1..=20 {
            let msg = format!(
                r#"{{"position":{{"x":{0},"y":{0},"z":{0}}},"rotation":{{"w":1,"x":0,"y":0,"z":0}}}}"#,
                i
            );
            tx.send_to(msg.as_bytes(), addr).unwrap();
        }

        // 最終メッセージの値が観測されるまでドレイン
        let start = Instant::now();
        let mut last = None;
        while start.elapsed() < Duration::from_secs(2) {
            if let Some(pose) = slot.take() {
                last = Some(pose);
                if pose.position[0] == 20.0 {
                    break;
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(last.expect("no pose received").position, [20.0, 20.0, 20.0]);

        listener.stop();
    }

    #[test]
    fn test_stop_is_bounded_and_final() {
        let slot = Arc::new(PoseSlot::new());
        let listener = PoseListener::start(0, slot.clone()).unwrap();
        let addr = listener.local_addr();

        let start = Instant::now();
        listener.stop();
        // 受信タイムアウト＋余裕以内に合流する
        assert!(start.elapsed() < Duration::from_secs(2));

        // 停止後の送信はスロットに現れない
        let tx = sender();
        tx.send_to(
            br#"{"position":{"x":9,"y":9,"z":9},"rotation":{"w":1,"x":0,"y":0,"z":0}}"#,
            addr,
        )
        .unwrap();
        thread::sleep(Duration::from_millis(300));
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_bind_conflict_is_fatal() {
        let slot = Arc::new(PoseSlot::new());
        let first = PoseListener::start(0, slot.clone()).unwrap();
        let port = first.local_addr().port();

        // 同じポートへの二重バインドはエラーとして返る
        assert!(PoseListener::start(port, slot.clone()).is_err());

        first.stop();
    }

    #[test]
    fn test_malform_log_rate_limit() {
        let mut log = MalformLog::new(4);
        let t0 = Instant::now();

        let mut logged = 0;
        for _ in 0..100 {
            if log.record(t0) {
                logged += 1;
            }
        }
        assert_eq!(logged, 4);
        assert_eq!(log.suppressed, 96);

        // 次のウィンドウで枠が戻る
        assert!(log.record(t0 + Duration::from_secs(2)));
        assert_eq!(log.suppressed, 0);
    }
}
