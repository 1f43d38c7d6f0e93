pub mod crawl;
pub mod data;
pub mod seeds;
