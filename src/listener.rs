use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::domain::entities::{billing_status::BillingStatus, inventory::Inventory, receipt::Receipt};

/// Receives the outcome of every client operation. Callbacks may run on any
/// thread, including the host thread that delivered a store reply.
pub trait BillingListener: Send + Sync {
    fn on_billing_success(&self, receipt: Receipt);

    fn on_consume_finished(&self, receipt: Receipt, success: bool);

    fn on_billing_status(&self, status: BillingStatus);

    fn on_query_inventory_finished(&self, inventory: Inventory);
}

/// Listener callbacks as values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    BillingSuccess(Receipt),
    ConsumeFinished { receipt: Receipt, success: bool },
    Status(BillingStatus),
    InventoryFinished(Inventory),
}

/// [`BillingListener`] that forwards every callback into a channel, for
/// hosts that prefer to consume events as a stream.
pub struct ChannelListener {
    events: UnboundedSender<BillingEvent>,
}

impl ChannelListener {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<BillingEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), rx)
    }

    fn emit(&self, event: BillingEvent) {
        if self.events.send(event).is_err() {
            debug!("Billing event dropped; receiver closed.");
        }
    }
}

impl BillingListener for ChannelListener {
    fn on_billing_success(&self, receipt: Receipt) {
        self.emit(BillingEvent::BillingSuccess(receipt));
    }

    fn on_consume_finished(&self, receipt: Receipt, success: bool) {
        self.emit(BillingEvent::ConsumeFinished { receipt, success });
    }

    fn on_billing_status(&self, status: BillingStatus) {
        self.emit(BillingEvent::Status(status));
    }

    fn on_query_inventory_finished(&self, inventory: Inventory) {
        self.emit(BillingEvent::InventoryFinished(inventory));
    }
}
