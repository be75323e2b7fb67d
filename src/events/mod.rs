use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{AppointmentStatus, CampaignStatus, MovementType};

/// Domain events emitted by the services after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    StockMovementRecorded {
        movement_id: Uuid,
        product_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
        new_stock: Decimal,
    },
    StockMovementDeleted {
        movement_id: Uuid,
        product_id: Uuid,
        stock_reversed: bool,
    },
    LowStockDetected {
        product_id: Uuid,
        current_stock: Decimal,
        min_stock: Decimal,
    },
    ClientSaved(Uuid),
    ClientDeleted(Uuid),
    AppointmentScheduled(Uuid),
    AppointmentStatusChanged {
        appointment_id: Uuid,
        old_status: AppointmentStatus,
        new_status: AppointmentStatus,
    },
    CampaignSaved(Uuid),
    CampaignDeleted(Uuid),
    CampaignStatusChanged {
        campaign_id: Uuid,
        old_status: CampaignStatus,
        new_status: CampaignStatus,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the processor is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStockDetected {
                product_id,
                current_stock,
                min_stock,
            } => {
                warn!(
                    %product_id,
                    %current_stock,
                    %min_stock,
                    "product is at or below minimum stock"
                );
            }
            Event::StockMovementRecorded {
                movement_id,
                product_id,
                movement_type,
                quantity,
                new_stock,
            } => {
                info!(
                    %movement_id,
                    %product_id,
                    %movement_type,
                    %quantity,
                    %new_stock,
                    "stock movement recorded"
                );
            }
            Event::AppointmentStatusChanged {
                appointment_id,
                old_status,
                new_status,
            } => {
                info!(%appointment_id, %old_status, %new_status, "appointment status changed");
            }
            Event::CampaignStatusChanged {
                campaign_id,
                old_status,
                new_status,
            } => {
                info!(%campaign_id, %old_status, %new_status, "campaign status changed");
            }
            other => info!("Received event: {:?}", other),
        }
    }

    warn!("Event processing loop has ended");
}
