// src/models/mod.rs

pub mod category;
pub mod identity;
pub mod leaderboard;
pub mod level;
pub mod progress;
pub mod question;
pub mod recommendation;
pub mod session;
pub mod timer;
