//! Subscriber API: the [`Subscribe`] trait, the fan-out [`SubscriberSet`],
//! and two ready-made subscribers ([`LogWriter`], [`ProcessTracker`]).

mod log;
mod set;
mod subscribe;
mod tracker;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
pub use tracker::ProcessTracker;
