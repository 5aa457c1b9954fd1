//! Markdown rendering for post bodies.

mod config;

use std::sync::Arc;

use comrak::{Arena, format_html, parse_document};
use once_cell::sync::Lazy;
use thiserror::Error;

use config::{build_post_sanitizer, default_options};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
}

/// Turns post markdown into the HTML stored alongside it.
pub trait RenderService: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, RenderError>;
}

/// GitHub-flavoured markdown through Comrak, sanitised with Ammonia.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_post_sanitizer(),
        }
    }
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl RenderService for ComrakRenderService {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;

        Ok(self.sanitizer.clean(&html).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        render_service().render(markdown).expect("render succeeds")
    }

    #[test]
    fn heading_renders_without_anchor_ids() {
        assert_eq!(render("# Hi"), "<h1>Hi</h1>\n");
    }

    #[test]
    fn gfm_tables_and_strikethrough_are_enabled() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn task_lists_keep_their_checkboxes() {
        let html = render("- [x] done\n- [ ] todo");
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("checked"));
    }

    #[test]
    fn scripts_are_stripped() {
        let html = render("hello <script>alert(1)</script>");
        assert!(!html.contains("<script"));
        assert!(html.contains("hello"));
    }

    #[test]
    fn bare_urls_become_links() {
        let html = render("see https://example.com");
        assert!(html.contains("<a href=\"https://example.com\""));
    }
}
