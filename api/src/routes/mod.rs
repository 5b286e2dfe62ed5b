pub mod chat {
    pub mod chat_request;
    pub mod chat_route;
}

pub mod tickets {
    pub mod get_ticket_route;
    pub mod list_tickets_route;
    pub mod ticket_models;
    pub mod ticket_stats_route;
    pub mod update_ticket_route;
}

pub mod health_route;
