use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::session::{MuxerSession, SessionStats};
use crate::av::Packet;
use crate::error::{MuxError, Result};

enum Command {
    Write(Packet),
    Close(oneshot::Sender<Result<SessionStats>>),
}

/// Feeds a [`MuxerSession`] running on its own task.
///
/// Packets are queued in order on a bounded channel, so a slow disk applies
/// backpressure to the producer instead of growing memory.
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
    task: JoinHandle<Result<()>>,
}

/// Moves `session` onto a new tokio task with room for `queue_depth` packets.
pub fn spawn(session: MuxerSession, queue_depth: usize) -> SessionHandle {
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let task = tokio::spawn(run(session, rx));
    SessionHandle { tx, task }
}

/// Ends with the error that stopped the session, if any.
async fn run(mut session: MuxerSession, mut rx: mpsc::Receiver<Command>) -> Result<()> {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Write(packet) => match session.write_packet(packet).await {
                Ok(()) => {}
                // already ended by an end-of-stream NAL; close still reports stats
                Err(MuxError::SessionClosed) => {}
                Err(e) => {
                    warn!("Background session stopped: {}", e);
                    // dropping the receiver fails later writes and any queued close
                    return Err(e);
                }
            },
            Command::Close(reply) => {
                let _ = reply.send(session.close().await);
                return Ok(());
            }
        }
    }

    // every handle is gone without an explicit close
    debug!("Session handle dropped, closing");
    session.close().await.map(|_| ())
}

impl SessionHandle {
    /// Queues a packet, waiting while the queue is full.
    ///
    /// Fails with [`MuxError::WorkerGone`] once the session has stopped.
    pub async fn write(&self, packet: Packet) -> Result<()> {
        self.tx
            .send(Command::Write(packet))
            .await
            .map_err(|_| MuxError::WorkerGone)
    }

    /// Closes the session after every queued packet has been written.
    ///
    /// If the session already stopped on an error, that error is returned.
    pub async fn close(self) -> Result<SessionStats> {
        let (reply, response) = oneshot::channel();
        if self.tx.send(Command::Close(reply)).await.is_ok() {
            if let Ok(stats) = response.await {
                let _ = self.task.await;
                return stats;
            }
        }
        match self.task.await {
            Ok(Err(e)) => Err(e),
            _ => Err(MuxError::WorkerGone),
        }
    }
}
