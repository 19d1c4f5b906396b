//! Reading-order reconstruction for positioned PDF text.
//!
//! Fragments are grouped into lines top to bottom and each line is read right
//! to left, which is the natural order for Arabic documents. Mixed-direction
//! lines are not reordered further.

/// Vertical distance under which two fragments belong to the same line.
pub const LINE_TOLERANCE: f32 = 5.0;

#[derive(Clone, Debug, PartialEq)]
pub struct TextFragment {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

impl TextFragment {
    pub fn new(x: f32, y: f32, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            text: text.into(),
        }
    }
}

/// Joins one page's fragments into text: lines by descending `y`, fragments
/// within a line by descending `x`, single spaces between fragments and
/// newlines between lines.
pub fn order_fragments(mut fragments: Vec<TextFragment>) -> String {
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut lines: Vec<(f32, Vec<TextFragment>)> = Vec::new();
    for fragment in fragments {
        match lines.last_mut() {
            Some((anchor, line)) if (*anchor - fragment.y).abs() <= LINE_TOLERANCE => {
                line.push(fragment)
            }
            _ => lines.push((fragment.y, vec![fragment])),
        }
    }

    lines
        .into_iter()
        .map(|(_, mut line)| {
            line.sort_by(|a, b| b.x.total_cmp(&a.x));
            line.iter()
                .map(|f| f.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
