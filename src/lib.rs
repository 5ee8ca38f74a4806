//! Build a Hot Wheels detection dataset: scrape tagged reference images from
//! the wiki, cut cars out of photographed sheets, and synthesize labeled
//! training frames.

pub mod cli;
pub mod dataset;
pub mod downloader;
pub mod finder;
pub mod models;
pub mod segment;
