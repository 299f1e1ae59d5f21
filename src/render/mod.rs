pub mod charts;
pub mod composer;
pub mod document;
pub mod geometry;
pub mod pdf;
pub mod text;
