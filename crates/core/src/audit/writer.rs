use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};
use crate::metrics::AUDIT_EVENTS;

/// Most events written in one store transaction.
pub const AUDIT_BATCH_SIZE: usize = 64;

impl From<AuditEventEnvelope> for AuditRecord {
    fn from(envelope: AuditEventEnvelope) -> Self {
        Self {
            id: 0,
            timestamp: envelope.timestamp,
            event_type: envelope.event.event_type().to_string(),
            ticket_id: envelope.event.ticket_id(),
            teller_id: envelope.event.teller_id().map(String::from),
            data: envelope.event,
        }
    }
}

/// What a writer did before its channel closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditWriterReport {
    pub written: u64,
    pub failed: u64,
}

/// Drains the audit channel into an [`AuditStore`].
///
/// Events that arrive together are stored in one batch, so a burst of teller
/// actions holds the shared database lock once instead of once per event.
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
    batch_size: usize,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self {
            rx,
            store,
            batch_size: AUDIT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run until every [`AuditHandle`] is dropped and the channel is empty.
    pub async fn run(mut self) -> AuditWriterReport {
        info!(batch_size = self.batch_size, "Audit writer started");
        let mut report = AuditWriterReport::default();
        let mut batch: Vec<AuditRecord> = Vec::with_capacity(self.batch_size);

        while let Some(first) = self.rx.recv().await {
            batch.push(first.into());
            while batch.len() < self.batch_size {
                match self.rx.try_recv() {
                    Ok(envelope) => batch.push(envelope.into()),
                    Err(_) => break,
                }
            }
            self.flush(&mut batch, &mut report);
        }

        info!(
            written = report.written,
            failed = report.failed,
            "Audit writer shutting down"
        );
        report
    }

    fn flush(&self, batch: &mut Vec<AuditRecord>, report: &mut AuditWriterReport) {
        let size = batch.len() as u64;
        match self.store.append_batch(batch) {
            Ok(_) => {
                debug!(events = size, "Audit batch stored");
                report.written += size;
                AUDIT_EVENTS.with_label_values(&["written"]).inc_by(size);
            }
            Err(e) => {
                // The batch is dropped; queue operations never wait on audit storage.
                let kinds: Vec<&str> = batch.iter().map(|r| r.event_type.as_str()).collect();
                error!(events = size, kinds = ?kinds, "Failed to store audit batch: {}", e);
                report.failed += size;
                AUDIT_EVENTS.with_label_values(&["failed"]).inc_by(size);
            }
        }
        batch.clear();
    }
}

/// Wire a bounded channel between producers and a writer.
///
/// Clone the handle into every producer and spawn `writer.run()` once.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}
