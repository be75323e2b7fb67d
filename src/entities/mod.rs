pub mod appointment;
pub mod campaign;
pub mod client;
pub mod procedure;
pub mod procedure_category;
pub mod product;
pub mod stock_movement;

pub use appointment::{AppointmentStatus, Entity as Appointment};
pub use campaign::{
    CampaignStatus, CampaignTargetType, CampaignTrigger, CampaignType, Entity as Campaign,
};
pub use client::{ClientSegment, ClientStatus, Entity as Client};
pub use procedure::Entity as Procedure;
pub use procedure_category::Entity as ProcedureCategory;
pub use product::Entity as Product;
pub use stock_movement::{Entity as StockMovement, MovementType};
