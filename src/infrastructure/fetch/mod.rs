mod web;

pub use web::{html_to_text, WebPageFetcher};
