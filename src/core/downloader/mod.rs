mod client;
mod http;

pub use client::{Digests, Downloader, FetchOutcome};
pub use http::{build_http_client, FetchResponse, HttpFetch, ReqwestFetcher};
