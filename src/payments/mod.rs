pub mod bazik;
pub mod classify;

pub use bazik::{BazikClient, IntentResult, PaymentIntent, PollResult};
pub use classify::{Outcome, PollClassification};
