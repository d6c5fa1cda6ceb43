pub mod event;
pub mod history;
pub mod level;
pub mod sequence;
pub mod session;
pub mod step;
