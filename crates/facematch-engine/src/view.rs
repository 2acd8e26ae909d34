//! Presentation of a comparison: main photo, full gallery, matched subset.

use facematch_core::MatchedSet;
use std::fmt::Write;

pub const NO_MATCHES: &str = "No matching images found.";

const MAIN_STYLE: &str = "width: 300px; height: auto; border: 3px solid black; margin-bottom: 20px";
const GALLERY_STYLE: &str = "width: 140px; height: auto; margin: 5px; border: 1px solid gray";
const MATCHED_STYLE: &str = "width: 140px; height: auto; margin: 5px; border: 3px solid green";
const ROW_STYLE: &str = "display: flex; flex-wrap: wrap; justify-content: center";

/// Everything a results page shows.
#[derive(Debug, Clone)]
pub struct GalleryView<'a> {
    pub main: &'a str,
    pub gallery: &'a [String],
    pub matched: &'a MatchedSet,
}

impl<'a> GalleryView<'a> {
    pub fn new(main: &'a str, gallery: &'a [String], matched: &'a MatchedSet) -> Self {
        Self { main, gallery, matched }
    }

    /// Standalone HTML page with the three regions.
    pub fn render_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">");
        html.push_str("<title>Face matches</title></head>\n<body>\n");
        html.push_str("<div style=\"text-align: center; padding: 20px\">\n");

        html.push_str("<h2>Main Image</h2>\n");
        let _ = writeln!(
            html,
            "<img src=\"{}\" alt=\"Main\" style=\"{MAIN_STYLE}\">",
            escape(self.main)
        );

        html.push_str("<h2>All Images</h2>\n");
        let _ = writeln!(html, "<div style=\"{ROW_STYLE}\">");
        for (index, src) in self.gallery.iter().enumerate() {
            let _ = writeln!(
                html,
                "<img src=\"{}\" alt=\"img-{index}\" style=\"{GALLERY_STYLE}\">",
                escape(src)
            );
        }
        html.push_str("</div>\n");

        html.push_str("<h2>Matched Images</h2>\n");
        let _ = writeln!(html, "<div style=\"{ROW_STYLE}; margin-top: 20px\">");
        if self.matched.is_empty() {
            let _ = writeln!(html, "<p>{NO_MATCHES}</p>");
        } else {
            for m in &self.matched.matches {
                let note = if m.fallback { " (closest available)" } else { "" };
                let title = format!("distance {:.3}{note}", m.distance);
                let _ = writeln!(
                    html,
                    "<img src=\"{}\" alt=\"Matched\" title=\"{title}\" style=\"{MATCHED_STYLE}\">",
                    escape(&m.image),
                );
            }
        }
        html.push_str("</div>\n</div>\n</body>\n</html>\n");
        html
    }

    /// Plain-text summary for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Main image: {}", self.main);
        let _ = writeln!(out, "All images ({}):", self.gallery.len());
        for src in self.gallery {
            let _ = writeln!(out, "  {src}");
        }
        let _ = writeln!(out, "Matched images ({}):", self.matched.len());
        if self.matched.is_empty() {
            let _ = writeln!(out, "  {NO_MATCHES}");
        }
        for m in &self.matched.matches {
            let note = if m.fallback { "  [closest available]" } else { "" };
            let _ = writeln!(out, "  {}  distance={:.3}{note}", m.image, m.distance);
        }
        out
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
