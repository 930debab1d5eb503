//! SVG Chart Generator for evaluation results
//!
//! Produces an annotated confusion matrix: coloured cells with their counts,
//! class names on both axes and axis titles.

use std::fs;
use std::path::Path;

use skin_core::{ConfusionMatrix, Error, Result};

use crate::colormap::{count_color, hex, is_dark};

/// Chart styling constants
const CELL: f64 = 90.0;
const MARGIN_TOP: f64 = 70.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 120.0;

const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

pub const DEFAULT_TITLE: &str = "Confusion Matrix - Skin Diseases Classification";

/// Builds the SVG document for a confusion matrix
pub fn confusion_matrix_svg(
    cm: &ConfusionMatrix,
    class_names: &[&str],
    title: &str,
) -> Result<String> {
    if class_names.len() != cm.num_classes {
        return Err(Error::InvalidArgument(format!(
            "{} class names given for a {}-class matrix",
            class_names.len(),
            cm.num_classes
        )));
    }

    let n = cm.num_classes as f64;
    let plot = n * CELL;
    let width = MARGIN_LEFT + plot + MARGIN_RIGHT;
    let height = MARGIN_TOP + plot + MARGIN_BOTTOM;
    let max = cm.max_count();

    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        width, height, width, height
    ));
    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        width, height
    ));

    // Title
    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        width / 2.0, COLOR_TEXT, escape_xml(title)
    ));

    // Cells
    for row in 0..cm.num_classes {
        for col in 0..cm.num_classes {
            let count = cm.get(row, col);
            let fill = count_color(count, max);
            let x = MARGIN_LEFT + col as f64 * CELL;
            let y = MARGIN_TOP + row as f64 * CELL;
            let text_color = if is_dark(fill) { "white" } else { COLOR_TEXT };

            svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="white" stroke-width="1"/>"#,
                x, y, CELL, CELL, hex(fill)
            ));
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="16" fill="{}">{}</text>"#,
                x + CELL / 2.0, y + CELL / 2.0 + 6.0, text_color, count
            ));
        }
    }

    // Tick labels
    for (i, name) in class_names.iter().enumerate() {
        let center = i as f64 * CELL + CELL / 2.0;
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            MARGIN_LEFT + center, MARGIN_TOP + plot + 20.0, COLOR_TEXT, escape_xml(name)
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            MARGIN_LEFT - 10.0, MARGIN_TOP + center + 4.0, COLOR_TEXT, escape_xml(name)
        ));
    }

    // Frame
    svg.push_str(&format!(
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP, plot, plot, COLOR_AXIS
    ));

    // Axis labels
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">Predicted Label</text>"#,
        MARGIN_LEFT + plot / 2.0, height - 25.0, COLOR_TEXT
    ));
    let y_mid = MARGIN_TOP + plot / 2.0;
    svg.push_str(&format!(
        r#"<text x="25" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 25 {})">True Label</text>"#,
        y_mid, COLOR_TEXT, y_mid
    ));

    svg.push_str("</svg>");
    Ok(svg)
}

/// Writes the annotated confusion matrix SVG
pub fn save_confusion_matrix_svg(
    cm: &ConfusionMatrix,
    class_names: &[&str],
    output_path: &Path,
) -> Result<()> {
    let svg = confusion_matrix_svg(cm, class_names, DEFAULT_TITLE)?;
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, svg)?;
    Ok(())
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_contains_labels_and_counts() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1, 1], &[0, 1, 1, 1, 1], 2).unwrap();
        let svg = confusion_matrix_svg(&cm, &["acne", "eksim"], DEFAULT_TITLE).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">acne</text>"));
        assert!(svg.contains(">eksim</text>"));
        assert!(svg.contains(">3</text>"));
        assert!(svg.contains("Predicted Label"));
        assert!(svg.contains("True Label"));
        assert!(svg.contains("#08306b"));
        // one rect per cell, plus background and frame
        assert_eq!(svg.matches("<rect").count(), 4 + 2);
    }

    #[test]
    fn test_title_is_escaped() {
        let cm = ConfusionMatrix::new(1);
        let svg = confusion_matrix_svg(&cm, &["a"], "A & B").unwrap();
        assert!(svg.contains("A &amp; B"));
    }

    #[test]
    fn test_name_count_mismatch() {
        let cm = ConfusionMatrix::new(2);
        assert!(confusion_matrix_svg(&cm, &["a"], DEFAULT_TITLE).is_err());
    }
}
