use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

/// Events a recognizer delivers for one listening turn, in order:
/// `Started`, zero or more `Interim` results, at most one `Final`, then
/// `Ended`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Interim(String),
    Final(String),
    Ended,
}

/// Write half of a recognition session. Once the session is stopped,
/// every push is silently dropped.
#[derive(Clone)]
pub struct RecognitionSender {
    tx: mpsc::Sender<RecognitionEvent>,
    stopped: Arc<AtomicBool>,
}

impl RecognitionSender {
    pub async fn send(&self, event: RecognitionEvent) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(event).await;
    }
}

/// Read half of a recognition session. `stop` guarantees that no event
/// is observed after it returns, including events already queued.
pub struct RecognitionSession {
    rx: mpsc::Receiver<RecognitionEvent>,
    stopped: Arc<AtomicBool>,
}

pub fn channel() -> (RecognitionSender, RecognitionSession) {
    let (tx, rx) = mpsc::channel(16);
    let stopped = Arc::new(AtomicBool::new(false));
    (
        RecognitionSender {
            tx,
            stopped: Arc::clone(&stopped),
        },
        RecognitionSession { rx, stopped },
    )
}

impl RecognitionSession {
    pub async fn next_event(&mut self) -> Option<RecognitionEvent> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        self.rx.recv().await
    }

    /// Wait for the next final utterance, skipping interim results and
    /// turn boundaries. Returns `None` once the source is exhausted or
    /// the session was stopped.
    pub async fn final_result(&mut self) -> Option<String> {
        while let Some(event) = self.next_event().await {
            if let RecognitionEvent::Final(text) = event {
                return Some(text);
            }
        }
        None
    }

    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.rx.close();
        // Drain anything that landed before the gate closed.
        while self.rx.try_recv().is_ok() {}
    }
}

/// Line-oriented stand-in for a speech recognizer: each non-empty stdin
/// line becomes one Started/Final/Ended turn. An empty line is a silent
/// turn (Started then Ended, no Final).
pub fn spawn_line_reader() -> RecognitionSession {
    let (tx, session) = channel();

    tokio::spawn(async move {
        let stdin = tokio::io::stdin();
        let mut lines = tokio::io::BufReader::new(stdin).lines();

        loop {
            tx.send(RecognitionEvent::Started).await;
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let text = line.trim().to_string();
                    if !text.is_empty() {
                        tx.send(RecognitionEvent::Final(text)).await;
                    }
                    tx.send(RecognitionEvent::Ended).await;
                }
                _ => {
                    tx.send(RecognitionEvent::Ended).await;
                    break;
                }
            }
        }
    });

    session
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_recognition_order() {
        let (tx, mut session) = channel();

        tx.send(RecognitionEvent::Started).await;
        tx.send(RecognitionEvent::Interim("a do".into())).await;
        tx.send(RecognitionEvent::Final("a dog!".into())).await;
        tx.send(RecognitionEvent::Ended).await;

        assert_eq!(session.next_event().await, Some(RecognitionEvent::Started));
        assert_eq!(
            session.next_event().await,
            Some(RecognitionEvent::Interim("a do".into()))
        );
        assert_eq!(
            session.next_event().await,
            Some(RecognitionEvent::Final("a dog!".into()))
        );
        assert_eq!(session.next_event().await, Some(RecognitionEvent::Ended));
    }

    #[tokio::test]
    async fn final_result_skips_interim_results() {
        let (tx, mut session) = channel();

        tx.send(RecognitionEvent::Started).await;
        tx.send(RecognitionEvent::Interim("bro".into())).await;
        tx.send(RecognitionEvent::Final("brown".into())).await;

        assert_eq!(session.final_result().await, Some("brown".into()));
    }

    #[tokio::test]
    async fn nothing_is_observed_after_stop() {
        let (tx, mut session) = channel();

        tx.send(RecognitionEvent::Started).await;
        tx.send(RecognitionEvent::Final("too late".into())).await;

        session.stop();
        assert_eq!(session.next_event().await, None);
        assert_eq!(session.final_result().await, None);

        // Pushes after stop are dropped, not errors.
        tx.send(RecognitionEvent::Ended).await;
        assert_eq!(session.next_event().await, None);
    }

    #[tokio::test]
    async fn closed_source_ends_the_session() {
        let (tx, mut session) = channel();
        tx.send(RecognitionEvent::Started).await;
        tx.send(RecognitionEvent::Ended).await;
        drop(tx);

        assert_eq!(session.final_result().await, None);
    }
}
