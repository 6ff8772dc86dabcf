use std::collections::HashMap;

use crate::models::{Line, Token};

/// Fraction of the dominant font height used as the line-clustering band.
pub const DEFAULT_TOLERANCE_FACTOR: f64 = 0.6;

/// Most common token height on the page, rounded to half a point.
/// Line spacing varies across statements, so the tolerance scales with this.
fn dominant_font_height(tokens: &[Token]) -> f64 {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for t in tokens {
        let key = (t.height * 2.0).round() as i64;
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(key, count)| (count, key))
        .map(|(key, _)| key as f64 / 2.0)
        .unwrap_or(10.0)
}

/// Group a page's raw tokens into ordered lines.
///
/// Tokens are sorted by vertical center and clustered into lines whose
/// centers fall within `tolerance_factor` of the dominant font height.
/// Whitespace-only and zero-size tokens are dropped. An empty page yields
/// an empty sequence.
pub fn lines_from_tokens(tokens: &[Token], tolerance_factor: f64) -> Vec<Line> {
    let mut tokens: Vec<Token> = tokens
        .iter()
        .filter(|t| !t.text.trim().is_empty() && t.width > 0.0 && t.height > 0.0)
        .cloned()
        .collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let tolerance = dominant_font_height(&tokens) * tolerance_factor;
    tokens.sort_by(|a, b| {
        a.center_y()
            .partial_cmp(&b.center_y())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut lines: Vec<Line> = Vec::new();
    for token in tokens {
        match lines.last_mut() {
            Some(line) if (token.center_y() - line.center_y()).abs() <= tolerance => {
                line.tokens.push(token);
            }
            _ => lines.push(Line {
                tokens: vec![token],
            }),
        }
    }

    rebalance_boundaries(&mut lines);

    for line in &mut lines {
        line.tokens.sort_by(|a, b| {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        });
        for t in &mut line.tokens {
            t.text = t.text.trim().to_string();
        }
    }
    lines.retain(|l| !l.tokens.is_empty());
    lines
}

/// Move tokens that straddle a cluster boundary to the nearer line by
/// centroid distance. Ties stay with the upper line.
fn rebalance_boundaries(lines: &mut [Line]) {
    for i in 0..lines.len().saturating_sub(1) {
        let upper_y = lines[i].center_y();
        let lower_y = lines[i + 1].center_y();

        // Last-added tokens of the upper line may in fact sit closer to the
        // line below.
        let mut moved_down = Vec::new();
        lines[i].tokens.retain(|t| {
            let cy = t.center_y();
            if (lower_y - cy).abs() < (cy - upper_y).abs() {
                moved_down.push(t.clone());
                false
            } else {
                true
            }
        });
        lines[i + 1].tokens.splice(0..0, moved_down);
    }
}
