pub mod calendar;
pub mod conversation;
pub mod detail;
pub mod edit;
pub mod list;
