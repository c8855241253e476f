//! HTTP binding between the scanview session controllers and the analysis
//! backend (`/chat`, `/analyze`, `/recent-scans`, `/uploads/<file>`).

pub mod http;

pub use http::HttpBackend;
