pub mod annotate;
pub mod compositor;
pub mod geometry;
pub mod grouping;
pub mod label_font;
pub mod raster;
pub mod region;
pub mod similarity;
pub mod texture;
pub mod utils;
