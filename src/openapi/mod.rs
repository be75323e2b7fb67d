use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic API",
        version = "0.1.0",
        description = r#"
# Clinic API

Backend for an aesthetics clinic.

## Features

- **Stock ledger**: append-only movements keep each product's stock in step
- **Stock reports**: movement summaries, valuation at cost, low-stock and expiry alerts
- **Cash flow**: day-by-day balance projection with weekly or monthly roll-ups
- **Clients**: records with CPF and phone validation, statistics and debounced draft auto-save
- **Agenda**: procedures, categories and appointments with status rules
- **Links**: WhatsApp and Google Calendar deep links
- **Campaigns**: marketing campaigns with performance rates and audience targeting

## Authentication

Every `/api/v1` endpoint expects a session token:

```
Authorization: Bearer <jwt>
```

The token's `sub` claim is the clinic account id; all data is scoped to it.

## Pagination

List endpoints take `page` (1-based) and `per_page`, and answer with
`{ "data": [...], "pagination": { "page", "per_page", "total", "total_pages" } }`.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "products", description = "Stocked products and stock reports"),
        (name = "stock-movements", description = "Stock movement ledger"),
        (name = "clients", description = "Client records"),
        (name = "procedures", description = "Procedure catalogue"),
        (name = "appointments", description = "Clinic agenda"),
        (name = "cash-flow", description = "Cash-flow projection"),
        (name = "campaigns", description = "Marketing campaigns")
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::toggle_product,
        crate::handlers::products::list_categories,
        crate::handlers::products::stock_summary,
        crate::handlers::products::stock_valuation,
        crate::handlers::products::stock_alerts,
        crate::handlers::products::check_availability,
        crate::handlers::products::recent_movements,

        // Stock movements
        crate::handlers::stock_movements::list_movements,
        crate::handlers::stock_movements::create_movement,
        crate::handlers::stock_movements::get_movement,
        crate::handlers::stock_movements::delete_movement,
        crate::handlers::stock_movements::movement_summary,

        // Clients
        crate::handlers::clients::list_clients,
        crate::handlers::clients::create_client,
        crate::handlers::clients::get_client,
        crate::handlers::clients::update_client,
        crate::handlers::clients::delete_client,
        crate::handlers::clients::client_stats,
        crate::handlers::clients::stage_draft,
        crate::handlers::clients::cancel_draft,
        crate::handlers::clients::whatsapp_link,
        crate::handlers::clients::client_history,
        crate::handlers::clients::upcoming_birthdays,
        crate::handlers::clients::update_segment,
        crate::handlers::clients::bulk_update_segments,

        // Procedures
        crate::handlers::procedures::list_categories,
        crate::handlers::procedures::create_category,
        crate::handlers::procedures::update_category,
        crate::handlers::procedures::delete_category,
        crate::handlers::procedures::list_procedures,
        crate::handlers::procedures::create_procedure,
        crate::handlers::procedures::get_procedure,
        crate::handlers::procedures::update_procedure,
        crate::handlers::procedures::delete_procedure,

        // Appointments
        crate::handlers::appointments::list_appointments,
        crate::handlers::appointments::create_appointment,
        crate::handlers::appointments::get_appointment,
        crate::handlers::appointments::update_appointment,
        crate::handlers::appointments::update_status,
        crate::handlers::appointments::delete_appointment,
        crate::handlers::appointments::calendar_link,

        // Cash flow
        crate::handlers::cash_flow::project_cash_flow,

        // Campaigns
        crate::handlers::campaigns::list_campaigns,
        crate::handlers::campaigns::create_campaign,
        crate::handlers::campaigns::get_campaign,
        crate::handlers::campaigns::update_campaign,
        crate::handlers::campaigns::delete_campaign,
        crate::handlers::campaigns::set_campaign_status,
        crate::handlers::campaigns::duplicate_campaign,
        crate::handlers::campaigns::campaign_audience,
        crate::handlers::campaigns::campaign_targeting,
        crate::handlers::campaigns::campaign_report,
    ),
    components(
        schemas(
            crate::handlers::common::PaginationMeta,
            crate::entities::MovementType,
            crate::entities::AppointmentStatus,
            crate::entities::ClientStatus,
            crate::entities::ClientSegment,
            crate::entities::CampaignType,
            crate::entities::CampaignStatus,
            crate::entities::CampaignTrigger,
            crate::entities::CampaignTargetType,
            crate::services::campaigns::AudienceKind,
            crate::ledger::AlertKind,
            crate::ledger::AlertSeverity,
            crate::cashflow::CashFlowEntry,
            crate::cashflow::Granularity,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
