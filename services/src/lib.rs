//! Durable session state: conversation memory and escalation tickets,
//! both backed by SQLite.

pub mod errors;
pub mod memory;
pub mod tickets;

pub use errors::ServiceError;
pub use memory::{ConversationMemory, MemoryExchange};
pub use tickets::{
    NewTicket, Ticket, TicketPage, TicketService, TicketStats, TicketStatus, TicketUpdate,
};
