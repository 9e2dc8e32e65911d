use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::pose::Pose;

/// リスナースレッドとレンダーループで共有する最新ポーズスロット
///
/// 書き込みは常に上書き（last-write-wins）。キューも合成もなし。
/// dirtyフラグはロック保持中にのみ立てるので、フラグとペイロードが
/// ばらばらに見えることはない。
pub struct PoseSlot {
    latest: Mutex<Option<Pose>>,
    dirty: AtomicBool,
}

impl PoseSlot {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            dirty: AtomicBool::new(false),
        }
    }

    /// 新しいポーズを公開する。以前の未消費の値は黙って破棄される。
    pub fn publish(&self, pose: Pose) {
        let mut guard = self.latest.lock().unwrap();
        *guard = Some(pose);
        self.dirty.store(true, Ordering::Release);
    }

    /// 未消費の更新があればコピーを返し、dirtyフラグを下ろす。
    /// 更新がなければロックを取らずに即座にNoneを返す。
    pub fn take(&self) -> Option<Pose> {
        if !self.dirty.load(Ordering::Acquire) {
            return None;
        }
        let guard = self.latest.lock().unwrap();
        self.dirty.store(false, Ordering::Release);
        *guard
    }
}

impl Default for PoseSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_take_empty() {
        let slot = PoseSlot::new();
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_publish_take_take() {
        let slot = PoseSlot::new();
        slot.publish(Pose::new([1.0, 2.0, 3.0], [1.0, 0.0, 0.0, 0.0]));

        let pose = slot.take().unwrap();
        assert_eq!(pose.position, [1.0, 2.0, 3.0]);
        assert_eq!(pose.rotation, [1.0, 0.0, 0.0, 0.0]);

        // 新しいメッセージがなければ2回目はNone
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let slot = PoseSlot::new();
        for i in 1..=10 {
            let v = i as f64;
            slot.publish(Pose::new([v, v, v], [1.0, 0.0, 0.0, 0.0]));
        }

        let pose = slot.take().unwrap();
        assert_eq!(pose.position, [10.0, 10.0, 10.0]);
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_no_torn_reads() {
        // 書き込みスレッドが全成分同値のポーズを流し続け、
        // 読み側で成分の混在が観測されないことを確認する
        let slot = Arc::new(PoseSlot::new());
        let writer_slot = slot.clone();

        let writer = std::thread::spawn(move || {
            for i in 0..10_000 {
                let v = i as f64;
                writer_slot.publish(Pose::new([v, v, v], [v, v, v, v]));
            }
        });

        let mut observed = 0u32;
        while observed < 1_000 {
            if let Some(pose) = slot.take() {
                let v = pose.position[0];
                assert_eq!(pose.position, [v, v, v]);
                assert_eq!(pose.rotation, [v, v, v, v]);
                observed += 1;
            }
            if writer.is_finished() {
                break;
            }
        }
        writer.join().unwrap();

        // 最終値は必ず観測可能
        if let Some(pose) = slot.take() {
            let v = pose.position[0];
            assert_eq!(pose.position, [v, v, v]);
        }
    }
}
