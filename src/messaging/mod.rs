//! Event messaging between the session engine and its views.
//!
//! The engine publishes [`UiEvent`]s on an [`EventBus`]; the REPL and the
//! one-shot runner subscribe and render them.
//!
//! ```text
//!     ┌──────────────────┐     publish      ┌──────────┐
//!     │ SessionController├─────────────────►│ EventBus │
//!     └──────────────────┘                  └────┬─────┘
//!                                                │ broadcast
//!                                   ┌────────────┴───────────┐
//!                                   ▼                        ▼
//!                             ┌──────────┐            ┌────────────┐
//!                             │   REPL   │            │  One-shot  │
//!                             │ live view│            │   runner   │
//!                             └──────────┘            └────────────┘
//! ```

mod bus;
mod types;

pub use bus::{BusError, EventBus, EventReceiver, EventSender};
pub use types::{NoticeLevel, UiEvent};
