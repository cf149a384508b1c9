//! Static file handler.
//!
//! A thin wrapper around `tower_http::services::ServeDir`: directory requests
//! get `index.html`, nothing is listed, and paths escaping the root are
//! rejected by `ServeDir` itself.

use tower_http::services::ServeDir;

use crate::config::schema::SiteConfig;

pub fn serve_site(site: &SiteConfig) -> ServeDir {
    ServeDir::new(&site.root).append_index_html_on_directories(true)
}
