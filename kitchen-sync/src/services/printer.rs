//! Ticket printer that logs and records what it printed

use crate::orders::error::OrderResult;
use crate::orders::traits::{TicketKind, TicketPrinter};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::order::Order;

#[derive(Debug, Clone, PartialEq)]
pub struct PrintedTicket {
    pub order_id: String,
    pub sequence_number: u64,
    pub kind: TicketKind,
}

#[derive(Debug, Default)]
pub struct RecordingTicketPrinter {
    printed: Mutex<Vec<PrintedTicket>>,
}

impl RecordingTicketPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn printed(&self) -> Vec<PrintedTicket> {
        self.printed.lock().clone()
    }

    pub fn count(&self, kind: TicketKind) -> usize {
        self.printed.lock().iter().filter(|t| t.kind == kind).count()
    }
}

#[async_trait]
impl TicketPrinter for RecordingTicketPrinter {
    async fn print_ticket(&self, order: &Order, kind: TicketKind) -> OrderResult<()> {
        tracing::info!(
            order_id = %order.id,
            seq = order.sequence_number,
            table_id = order.table_id.as_deref().unwrap_or("-"),
            items = order.item_count(),
            kind = ?kind,
            "Ticket printed"
        );
        self.printed.lock().push(PrintedTicket {
            order_id: order.id.clone(),
            sequence_number: order.sequence_number,
            kind,
        });
        Ok(())
    }
}
