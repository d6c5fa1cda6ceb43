pub mod entity;
pub mod geom;
pub mod grid;
pub mod occupancy;
pub mod rules;
