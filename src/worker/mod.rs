mod reset;

pub use reset::reset_scheduler;
