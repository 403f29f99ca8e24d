//! 尾沿防抖
//!
//! 每次 `schedule` 都会取消尚未触发的延迟任务并重新计时，静默期满后把最后一个值
//! 发送到接收端。触发的值带有代号，`accept` 拒绝已被取代的旧值，
//! 防止延迟任务在取消前已经发出的值越过新的输入。

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct Debounced<T> {
    generation: u64,
    value: T,
}

pub struct Debouncer<T> {
    window: Duration,
    generation: u64,
    tx: mpsc::UnboundedSender<Debounced<T>>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<Debounced<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            generation: 0,
            tx,
            pending: None,
        };
        (debouncer, rx)
    }

    /// 取消当前计时，用新值重新计时
    pub fn schedule(&mut self, value: T) {
        self.cancel();

        let tx = self.tx.clone();
        let window = self.window;
        let fired = Debounced {
            generation: self.generation,
            value,
        };
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(fired);
        }));
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 接受最新一次计时触发的值，过期值返回 `None`
    pub fn accept(&mut self, fired: Debounced<T>) -> Option<T> {
        if fired.generation != self.generation {
            return None;
        }
        self.pending = None;
        Some(fired.value)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
