pub mod entity;
pub mod grid;
pub mod nav;
pub mod physics;
pub mod rules;
pub mod tile;
