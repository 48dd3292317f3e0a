//! SVG serialisation and PNG rasterisation of frames.
//!
//! Sky objects are drawn inside a group clipped to the sky circle, so clipped
//! paths that hug the horizon and point objects near the rim never spill over
//! the disc edge.

use std::fmt::Write as _;
use std::path::Path;

use tiny_skia::{Pixmap, Transform};
use usvg::{Options, Tree};

use crate::render::{DrawCommand, Frame, Style};
use crate::{Result, SkyError};

/// Extra height below the disc for the footer
const FOOTER_HEIGHT: f64 = 30.0;

const STYLESHEET: &str = "
.night-sky { fill: url(#night-gradient); }
.day-sky { fill: url(#day-gradient); }
.constellation-bounds { fill: none; stroke: #3a3a5a; stroke-width: 1; stroke-dasharray: 2 3; }
.constellation-line { fill: none; stroke: #6a6a9a; stroke-width: 1.5; }
.sky-label { fill: #c0c0d0; font-family: sans-serif; font-size: 12px; }
.constellation-label { fill: #8080a0; }
.compass { fill: #a0a0b0; font-family: sans-serif; font-size: 12px; }
";

/// Escape text for use inside SVG elements and attributes
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn style_attrs(style: &Style) -> String {
    let mut attrs = format!(r#"class="{}""#, escape(&style.class));
    match &style.fill {
        Some(fill) => {
            let _ = write!(attrs, r#" fill="{}""#, escape(fill));
        }
        None if style.stroke.is_some() => attrs.push_str(r#" fill="none""#),
        None => {}
    }
    if let Some(stroke) = &style.stroke {
        let _ = write!(attrs, r#" stroke="{}""#, escape(stroke));
    }
    if let Some(width) = style.stroke_width {
        let _ = write!(attrs, r#" stroke-width="{width}""#);
    }
    if style.opacity < 1.0 {
        let _ = write!(attrs, r#" opacity="{:.3}""#, style.opacity);
    }
    attrs
}

fn write_command(svg: &mut String, command: &DrawCommand) {
    let _ = match command {
        DrawCommand::Background { center, radius, class } => writeln!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" class="{}"/>"#,
            center.x,
            center.y,
            radius,
            escape(class)
        ),
        DrawCommand::Path { path, style } => {
            let d = path.to_svg_d();
            if d.is_empty() {
                return;
            }
            writeln!(svg, r#"<path d="{d}" {}/>"#, style_attrs(style))
        }
        DrawCommand::Circle { center, radius, style, .. } => writeln!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" {}/>"#,
            center.x,
            center.y,
            radius,
            style_attrs(style)
        ),
        DrawCommand::Text {
            position,
            text,
            anchor,
            dx_em,
            dy_em,
            style,
        } => writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" dx="{dx_em}em" dy="{dy_em}em" text-anchor="{}" {}>{}</text>"#,
            position.x,
            position.y,
            anchor.as_str(),
            style_attrs(style),
            escape(text)
        ),
    };
}

/// Serialise a frame to a standalone SVG document
pub fn to_svg(frame: &Frame) -> String {
    let r = frame.view.radius;
    let width = 2.25 * r;
    let height = 2.0 * r + FOOTER_HEIGHT;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.2} {height:.2}">"#
    );
    let _ = writeln!(svg, "<defs>");
    let _ = writeln!(
        svg,
        r#"<clipPath id="sky-clip"><circle cx="{r:.2}" cy="{r:.2}" r="{r:.2}"/></clipPath>"#
    );
    let _ = writeln!(
        svg,
        r##"<radialGradient id="night-gradient"><stop offset="85%" stop-color="black"/><stop offset="93%" stop-color="#101035"/><stop offset="100%" stop-color="#191970"/></radialGradient>"##
    );
    let _ = writeln!(
        svg,
        r##"<radialGradient id="day-gradient"><stop offset="85%" stop-color="#4a80c8"/><stop offset="100%" stop-color="#8ab4e8"/></radialGradient>"##
    );
    let _ = writeln!(svg, "<style>{STYLESHEET}</style>");
    let _ = writeln!(svg, "</defs>");

    let _ = writeln!(svg, r#"<g clip-path="url(#sky-clip)">"#);
    for command in &frame.commands {
        write_command(&mut svg, command);
    }
    let _ = writeln!(svg, "</g>");
    for command in &frame.overlay {
        write_command(&mut svg, command);
    }
    svg.push_str("</svg>\n");
    svg
}

/// Write a frame as an SVG file
pub fn write_svg(frame: &Frame, path: &Path) -> Result<()> {
    std::fs::write(path, to_svg(frame))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Rasterise SVG text into a pixmap of the document's size
pub fn rasterize(svg: &str) -> Result<Pixmap> {
    let mut options = Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = Tree::from_str(svg, &options).map_err(|e| SkyError::Render(e.to_string()))?;

    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| SkyError::Render(format!("cannot allocate {}x{} pixmap", size.width(), size.height())))?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(pixmap)
}

/// Render a frame to a PNG file
pub fn write_png(frame: &Frame, path: &Path) -> Result<()> {
    let pixmap = rasterize(&to_svg(frame))?;
    pixmap
        .save_png(path)
        .map_err(|e| SkyError::Render(format!("failed to write {}: {e}", path.display())))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{ScreenPath, SubPath};
    use crate::labels::TextAnchor;
    use crate::projection::{Rotation, ScreenPoint, ViewState};
    use crate::render::{compass_rose, DrawMode, FrameStats};
    use tempfile::tempdir;

    fn frame() -> Frame {
        Frame {
            mode: DrawMode::Full,
            view: ViewState::new(Rotation::default(), 100.0),
            commands: vec![
                DrawCommand::Background {
                    center: ScreenPoint::new(100.0, 100.0),
                    radius: 100.0,
                    class: "sky-background night-sky".to_string(),
                },
                DrawCommand::Path {
                    path: ScreenPath {
                        subpaths: vec![SubPath {
                            points: vec![ScreenPoint::new(10.0, 10.0), ScreenPoint::new(20.0, 30.0)],
                            closed: false,
                        }],
                    },
                    style: Style::class("ecliptic").stroke("red", 2.0).opacity(0.6),
                },
                DrawCommand::Circle {
                    center: ScreenPoint::new(100.0, 100.0),
                    radius: 2.0,
                    style: Style::class("star").fill("#ffffff"),
                    hit: None,
                },
                DrawCommand::Text {
                    position: ScreenPoint::new(50.0, 60.0),
                    text: "Alpha & <Beta>".to_string(),
                    anchor: TextAnchor::Start,
                    dx_em: 0.35,
                    dy_em: -0.35,
                    style: Style::class("star-label sky-label").opacity(0.9),
                },
            ],
            overlay: compass_rose(100.0),
            stats: FrameStats::default(),
        }
    }

    #[test]
    fn test_document_size_and_clip() {
        let svg = to_svg(&frame());
        assert!(svg.contains(r#"width="225" height="230""#));
        assert!(svg.contains(r#"<clipPath id="sky-clip"><circle cx="100.00" cy="100.00" r="100.00"/>"#));
        assert!(svg.contains(r#"<g clip-path="url(#sky-clip)">"#));
    }

    #[test]
    fn test_commands_are_serialised_in_order() {
        let svg = to_svg(&frame());
        let background = svg.find("sky-background").unwrap();
        let ecliptic = svg.find(r#"d="M10.00,10.00L20.00,30.00""#).unwrap();
        let star = svg.find(r#"class="star""#).unwrap();
        assert!(background < ecliptic && ecliptic < star);
        assert!(svg.contains(r#"stroke="red" stroke-width="2" opacity="0.600""#));
    }

    #[test]
    fn test_compass_is_drawn_outside_the_clip() {
        let svg = to_svg(&frame());
        let clip_end = svg.find("</g>").unwrap();
        let compass = svg.find(r#"class="compass compass-spike""#).unwrap();
        assert!(compass > clip_end);
        for letter in ["W", "S", "E", "N"] {
            assert!(svg.contains(&format!(">{letter}</text>")));
        }
        assert_eq!(svg.matches("compass-letter").count(), 4);
    }

    #[test]
    fn test_text_is_escaped() {
        let svg = to_svg(&frame());
        assert!(svg.contains("Alpha &amp; &lt;Beta&gt;"));
        assert!(svg.contains(r#"text-anchor="start""#));
    }

    #[test]
    fn test_png_has_document_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sky.png");
        write_png(&frame(), &path).unwrap();

        let pixmap = Pixmap::load_png(&path).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (225, 230));
    }

    #[test]
    fn test_invalid_svg_is_render_error() {
        assert!(matches!(rasterize("<svg"), Err(SkyError::Render(_))));
    }
}
