mod conversation;
mod diary;
mod preferences;

pub use conversation::*;
pub use diary::*;
pub use preferences::*;
