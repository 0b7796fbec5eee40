pub mod controller;
pub mod event;
pub mod level;
pub mod save;
pub mod scheduler;
pub mod step;
pub mod world;
