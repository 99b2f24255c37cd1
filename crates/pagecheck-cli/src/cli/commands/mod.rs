pub mod check;
pub mod dispatch;
pub mod reporting;
pub mod run;
pub mod serve;

pub use dispatch::dispatch;
