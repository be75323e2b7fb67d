pub mod appointments;
pub mod campaigns;
pub mod cash_flow;
pub mod clients;
pub mod common;
pub mod procedures;
pub mod products;
pub mod stock_movements;

use std::sync::Arc;

use crate::{
    autosave::ClientDraftAutosaver,
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        appointments::AppointmentService, campaigns::CampaignService, cash_flow::CashFlowService,
        clients::ClientService,
        procedures::ProcedureService, products::ProductService, stock::StockService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub stock: Arc<StockService>,
    pub clients: Arc<ClientService>,
    pub procedures: Arc<ProcedureService>,
    pub appointments: Arc<AppointmentService>,
    pub cash_flow: Arc<CashFlowService>,
    pub campaigns: Arc<CampaignService>,
    pub client_drafts: Arc<ClientDraftAutosaver>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let products = Arc::new(ProductService::new(
            db_pool.clone(),
            event_sender.clone(),
            config.alert_expiry_window_days,
        ));
        let stock = Arc::new(StockService::new(
            db_pool.clone(),
            event_sender.clone(),
            config.reverse_stock_on_delete,
        ));
        let clients = Arc::new(ClientService::new(db_pool.clone(), event_sender.clone()));
        let procedures = Arc::new(ProcedureService::new(db_pool.clone()));
        let campaigns = Arc::new(CampaignService::new(
            db_pool.clone(),
            event_sender.clone(),
            clients.clone(),
        ));
        let appointments = Arc::new(AppointmentService::new(db_pool, event_sender));
        let cash_flow = Arc::new(CashFlowService::new(appointments.clone()));
        let client_drafts = Arc::new(ClientDraftAutosaver::new(
            clients.clone(),
            config.autosave_delay(),
        ));

        Self {
            products,
            stock,
            clients,
            procedures,
            appointments,
            cash_flow,
            campaigns,
            client_drafts,
        }
    }
}
