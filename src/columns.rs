use log::debug;
use regex::Regex;

use crate::classify::parse_amount;
use crate::models::{ColumnRole, ColumnSpec, Line, Token};

/// Heuristic knobs for line clustering and column inference.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Line-cluster tolerance as a fraction of the dominant font height.
    pub tolerance_factor: f64,
    /// Minimum horizontal gap (points) separating density bands.
    pub band_gap: f64,
    /// Distinct roles a line must match to qualify as a header.
    pub min_header_roles: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tolerance_factor: crate::normalizer::DEFAULT_TOLERANCE_FACTOR,
            band_gap: 18.0,
            min_header_roles: 3,
        }
    }
}

/// Outcome of column detection for a page.
#[derive(Debug, Clone)]
pub enum ColumnDetection {
    /// A header line matched the role vocabulary; its index is excluded
    /// from row assembly.
    Header {
        specs: Vec<ColumnSpec>,
        header_line: usize,
    },
    /// No header found; columns inferred from token density bands.
    Inferred { specs: Vec<ColumnSpec> },
    /// Fewer than two roles could be established. Rows are still assembled
    /// against Unknown columns; the caller degrades to raw-row output.
    Unresolved { specs: Vec<ColumnSpec> },
}

impl ColumnDetection {
    pub fn specs(&self) -> &[ColumnSpec] {
        match self {
            Self::Header { specs, .. } | Self::Inferred { specs } | Self::Unresolved { specs } => {
                specs
            }
        }
    }

    pub fn header_line(&self) -> Option<usize> {
        match self {
            Self::Header { header_line, .. } => Some(*header_line),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved { .. })
    }
}

fn header_vocabulary() -> Vec<(ColumnRole, Regex)> {
    // Match order matters: the first role a token matches claims it.
    vec![
        (
            ColumnRole::Date,
            Regex::new(r"(?i)date|posting\s*date|trans\.?\s*date").unwrap(),
        ),
        (
            ColumnRole::Description,
            Regex::new(r"(?i)description|details|transaction|particulars|payee").unwrap(),
        ),
        (
            ColumnRole::Withdrawal,
            Regex::new(r"(?i)withdrawal|debit|charges?|amount\s*deducted|^dr\.?$").unwrap(),
        ),
        (
            ColumnRole::Deposit,
            Regex::new(r"(?i)deposit|credit|amount\s*added|^cr\.?$").unwrap(),
        ),
        (
            ColumnRole::Balance,
            Regex::new(r"(?i)balance|closing|running").unwrap(),
        ),
    ]
}

/// Date-shaped strings: `Jan 5`, `Jan 5, 2024`, `3/4`, `03/04/2024`,
/// `2024-03-04`.
pub fn is_date_shaped(s: &str) -> bool {
    let re = Regex::new(
        r"(?ix)^(?:
            (?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[.\s]?\s*\d{1,2}(?:[,\s]+\d{2,4})?
            |\d{1,2}[/\-]\d{1,2}(?:[/\-]\d{2,4})?
            |\d{4}[/\-]\d{1,2}[/\-]\d{1,2}
        )$",
    )
    .unwrap();
    re.is_match(s.trim())
}

/// Match a line's tokens against the header vocabulary. Returns claimed
/// role seeds in left-to-right order when enough distinct roles match.
fn match_header(line: &Line, min_roles: usize) -> Option<Vec<(ColumnRole, f64, f64)>> {
    let vocab = header_vocabulary();
    let mut claimed: Vec<ColumnRole> = Vec::new();
    let mut seeds: Vec<(ColumnRole, f64, f64)> = Vec::new();

    for token in &line.tokens {
        let text = token.text.trim();
        let role = vocab
            .iter()
            .find(|(role, re)| !claimed.contains(role) && re.is_match(text))
            .map(|(role, _)| *role);
        match role {
            Some(role) => {
                claimed.push(role);
                seeds.push((role, token.x, token.right()));
            }
            None => seeds.push((ColumnRole::Unknown, token.x, token.right())),
        }
    }

    if claimed.len() >= min_roles {
        Some(seeds)
    } else {
        None
    }
}

/// True when a line reads like a column header (repeated headers on later
/// pages are skipped as data).
pub fn is_header_line(line: &Line, config: &DetectorConfig) -> bool {
    match_header(line, config.min_header_roles).is_some()
}

/// Turn role seeds (left-to-right) into a gap-free cover of the page:
/// adjacent seeds share the midpoint between their extents.
fn specs_from_seeds(seeds: &[(ColumnRole, f64, f64)], page_width: f64) -> Vec<ColumnSpec> {
    let mut merged: Vec<(ColumnRole, f64, f64)> = Vec::new();
    for &(role, start, end) in seeds {
        match merged.last_mut() {
            // Runs of unmatched tokens collapse into one Unknown column.
            Some((ColumnRole::Unknown, _, prev_end)) if role == ColumnRole::Unknown => {
                *prev_end = end;
            }
            _ => merged.push((role, start, end)),
        }
    }

    let mut specs = Vec::with_capacity(merged.len());
    for (i, &(role, start, end)) in merged.iter().enumerate() {
        let x_start = if i == 0 {
            0.0
        } else {
            (merged[i - 1].2 + start) / 2.0
        };
        let x_end = if i + 1 == merged.len() {
            page_width
        } else {
            (end + merged[i + 1].1) / 2.0
        };
        specs.push(ColumnSpec {
            role,
            x_start,
            x_end,
        });
    }
    specs
}

struct Band {
    min_x: f64,
    max_x: f64,
    tokens: usize,
    date_like: usize,
    amount_like: usize,
    negative_like: usize,
}

impl Band {
    fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    fn date_frac(&self) -> f64 {
        self.date_like as f64 / self.tokens as f64
    }

    fn amount_frac(&self) -> f64 {
        self.amount_like as f64 / self.tokens as f64
    }
}

/// Cluster tokens from all lines into vertical bands by horizontal position.
fn density_bands(lines: &[Line], gap: f64) -> Vec<Band> {
    let mut tokens: Vec<&Token> = lines.iter().flat_map(|l| l.tokens.iter()).collect();
    tokens.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let mut bands: Vec<Band> = Vec::new();
    for token in tokens {
        let text = token.text.trim();
        let date_like = usize::from(is_date_shaped(text));
        let amount_like = usize::from(
            text.chars().any(|c| c.is_ascii_digit()) && parse_amount(text).is_some(),
        );
        let negative_like = usize::from(
            amount_like == 1 && (text.starts_with('-') || text.starts_with('(')),
        );
        match bands.last_mut() {
            Some(band) if token.x - band.max_x <= gap => {
                band.max_x = band.max_x.max(token.right());
                band.min_x = band.min_x.min(token.x);
                band.tokens += 1;
                band.date_like += date_like;
                band.amount_like += amount_like;
                band.negative_like += negative_like;
            }
            _ => bands.push(Band {
                min_x: token.x,
                max_x: token.right(),
                tokens: 1,
                date_like,
                amount_like,
                negative_like,
            }),
        }
    }
    bands
}

/// Assign roles to density bands: date-shaped band, widest band as
/// description, then amount bands left-to-right as withdrawal, deposit,
/// balance by statement convention.
fn infer_from_density(lines: &[Line], page_width: f64, config: &DetectorConfig) -> ColumnDetection {
    let bands = density_bands(lines, config.band_gap);
    if bands.is_empty() {
        return ColumnDetection::Unresolved {
            specs: vec![ColumnSpec {
                role: ColumnRole::Unknown,
                x_start: 0.0,
                x_end: page_width,
            }],
        };
    }

    let mut roles = vec![ColumnRole::Unknown; bands.len()];

    let date_idx = bands
        .iter()
        .enumerate()
        .filter(|(_, b)| b.date_frac() >= 0.5)
        .max_by(|(_, a), (_, b)| {
            a.date_frac()
                .partial_cmp(&b.date_frac())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i);
    if let Some(i) = date_idx {
        roles[i] = ColumnRole::Date;
    }

    let desc_idx = bands
        .iter()
        .enumerate()
        .filter(|(i, _)| roles[*i] == ColumnRole::Unknown)
        .max_by(|(_, a), (_, b)| {
            a.width()
                .partial_cmp(&b.width())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i);
    if let Some(i) = desc_idx {
        roles[i] = ColumnRole::Description;
    }

    // Amount bands left-to-right become Withdrawal, Deposit, Balance by
    // statement convention. A leading band whose values mix explicit
    // negatives with positives is a single signed-amount column; what
    // follows it is the running balance, not a deposit column.
    let amount_idx: Vec<usize> = bands
        .iter()
        .enumerate()
        .filter(|(i, b)| roles[*i] == ColumnRole::Unknown && b.amount_frac() >= 0.6)
        .map(|(i, _)| i)
        .collect();
    let signed_single = amount_idx
        .first()
        .map(|&i| bands[i].negative_like > 0 && bands[i].negative_like < bands[i].amount_like)
        .unwrap_or(false);
    let amount_roles: &[ColumnRole] = if signed_single {
        &[ColumnRole::Withdrawal, ColumnRole::Balance]
    } else {
        &[
            ColumnRole::Withdrawal,
            ColumnRole::Deposit,
            ColumnRole::Balance,
        ]
    };
    let mut next_amount = 0;
    for &i in &amount_idx {
        if next_amount < amount_roles.len() {
            roles[i] = amount_roles[next_amount];
            next_amount += 1;
        }
    }

    let has_date = roles.contains(&ColumnRole::Date);
    let has_amount = next_amount > 0;
    let seeds: Vec<(ColumnRole, f64, f64)> = bands
        .iter()
        .zip(&roles)
        .map(|(b, &r)| (r, b.min_x, b.max_x))
        .collect();

    if !has_date && !has_amount {
        debug!("density inference failed: no date and no amount band");
        let unknown_seeds: Vec<(ColumnRole, f64, f64)> = seeds
            .iter()
            .map(|&(_, s, e)| (ColumnRole::Unknown, s, e))
            .collect();
        return ColumnDetection::Unresolved {
            specs: specs_from_seeds(&unknown_seeds, page_width),
        };
    }

    debug!("columns inferred from density: {roles:?}");
    ColumnDetection::Inferred {
        specs: specs_from_seeds(&seeds, page_width),
    }
}

/// Detect column boundaries and header semantics for a page.
pub fn detect_columns(lines: &[Line], page_width: f64, config: &DetectorConfig) -> ColumnDetection {
    for (idx, line) in lines.iter().enumerate() {
        if let Some(seeds) = match_header(line, config.min_header_roles) {
            debug!("header line found at index {idx}: {}", line.text());
            return ColumnDetection::Header {
                specs: specs_from_seeds(&seeds, page_width),
                header_line: idx,
            };
        }
    }
    infer_from_density(lines, page_width, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x: f64, width: f64, y: f64) -> Token {
        Token {
            text: text.to_string(),
            x,
            y,
            width,
            height: 10.0,
        }
    }

    fn line(tokens: Vec<Token>) -> Line {
        Line { tokens }
    }

    fn header_line() -> Line {
        line(vec![
            tok("Date", 20.0, 40.0, 50.0),
            tok("Description", 100.0, 80.0, 50.0),
            tok("Withdrawal", 300.0, 70.0, 50.0),
            tok("Deposit", 400.0, 60.0, 50.0),
            tok("Balance", 500.0, 60.0, 50.0),
        ])
    }

    #[test]
    fn test_header_detected_with_all_roles() {
        let lines = vec![header_line()];
        let det = detect_columns(&lines, 612.0, &DetectorConfig::default());
        assert!(matches!(det, ColumnDetection::Header { header_line: 0, .. }));
        let roles: Vec<ColumnRole> = det.specs().iter().map(|s| s.role).collect();
        assert_eq!(
            roles,
            vec![
                ColumnRole::Date,
                ColumnRole::Description,
                ColumnRole::Withdrawal,
                ColumnRole::Deposit,
                ColumnRole::Balance,
            ]
        );
    }

    #[test]
    fn test_specs_cover_page_without_gaps() {
        let lines = vec![header_line()];
        let det = detect_columns(&lines, 612.0, &DetectorConfig::default());
        let specs = det.specs();
        assert_eq!(specs.first().unwrap().x_start, 0.0);
        assert_eq!(specs.last().unwrap().x_end, 612.0);
        for pair in specs.windows(2) {
            assert_eq!(pair[0].x_end, pair[1].x_start);
        }
    }

    #[test]
    fn test_synonym_headers_match() {
        let lines = vec![line(vec![
            tok("Date", 20.0, 40.0, 50.0),
            tok("Particulars", 100.0, 80.0, 50.0),
            tok("Debit", 300.0, 50.0, 50.0),
            tok("Credit", 400.0, 50.0, 50.0),
        ])];
        let det = detect_columns(&lines, 612.0, &DetectorConfig::default());
        assert!(matches!(det, ColumnDetection::Header { .. }));
        let roles: Vec<ColumnRole> = det.specs().iter().map(|s| s.role).collect();
        assert!(roles.contains(&ColumnRole::Description));
        assert!(roles.contains(&ColumnRole::Withdrawal));
        assert!(roles.contains(&ColumnRole::Deposit));
    }

    #[test]
    fn test_two_role_line_is_not_header() {
        let lines = vec![line(vec![
            tok("Date", 20.0, 40.0, 50.0),
            tok("Balance", 500.0, 60.0, 50.0),
        ])];
        assert!(!is_header_line(&lines[0], &DetectorConfig::default()));
    }

    #[test]
    fn test_unmatched_header_tokens_become_unknown_column() {
        let lines = vec![line(vec![
            tok("Date", 20.0, 40.0, 50.0),
            tok("Ref", 80.0, 30.0, 50.0),
            tok("No.", 115.0, 20.0, 50.0),
            tok("Description", 160.0, 80.0, 50.0),
            tok("Debit", 300.0, 50.0, 50.0),
            tok("Credit", 400.0, 50.0, 50.0),
        ])];
        let det = detect_columns(&lines, 612.0, &DetectorConfig::default());
        let roles: Vec<ColumnRole> = det.specs().iter().map(|s| s.role).collect();
        // "Ref" and "No." collapse into a single Unknown column.
        assert_eq!(
            roles,
            vec![
                ColumnRole::Date,
                ColumnRole::Unknown,
                ColumnRole::Description,
                ColumnRole::Withdrawal,
                ColumnRole::Deposit,
            ]
        );
    }

    #[test]
    fn test_density_fallback_assigns_roles() {
        // No header; three data lines with date, description, amount,
        // balance shapes in consistent bands.
        let mut lines = Vec::new();
        for (i, (date, desc, amt, bal)) in [
            ("03/04", "COFFEE SHOP", "-4.50", "1200.00"),
            ("03/05", "PAYROLL DIRECT DEPOSIT", "2500.00", "3700.00"),
            ("03/06", "GROCERY MART", "-82.13", "3617.87"),
        ]
        .iter()
        .enumerate()
        {
            let y = 100.0 + i as f64 * 20.0;
            lines.push(line(vec![
                tok(date, 20.0, 40.0, y),
                tok(desc, 100.0, 150.0, y),
                tok(amt, 350.0, 50.0, y),
                tok(bal, 480.0, 60.0, y),
            ]));
        }
        let det = detect_columns(&lines, 612.0, &DetectorConfig::default());
        assert!(matches!(det, ColumnDetection::Inferred { .. }));
        let roles: Vec<ColumnRole> = det.specs().iter().map(|s| s.role).collect();
        // The signed amount band is followed by the running balance.
        assert_eq!(
            roles,
            vec![
                ColumnRole::Date,
                ColumnRole::Description,
                ColumnRole::Withdrawal,
                ColumnRole::Balance,
            ]
        );
    }

    #[test]
    fn test_density_fallback_unsigned_amount_pair() {
        let mut lines = Vec::new();
        for (i, (date, desc, wd, dp)) in [
            ("03/04", "COFFEE SHOP", "4.50", ""),
            ("03/05", "PAYROLL", "", "2500.00"),
            ("03/06", "GROCERY MART", "82.13", ""),
        ]
        .iter()
        .enumerate()
        {
            let y = 100.0 + i as f64 * 20.0;
            let mut tokens = vec![
                tok(date, 20.0, 40.0, y),
                tok(desc, 100.0, 150.0, y),
            ];
            if !wd.is_empty() {
                tokens.push(tok(wd, 350.0, 50.0, y));
            }
            if !dp.is_empty() {
                tokens.push(tok(dp, 480.0, 60.0, y));
            }
            lines.push(line(tokens));
        }
        let det = detect_columns(&lines, 612.0, &DetectorConfig::default());
        let roles: Vec<ColumnRole> = det.specs().iter().map(|s| s.role).collect();
        assert_eq!(
            roles,
            vec![
                ColumnRole::Date,
                ColumnRole::Description,
                ColumnRole::Withdrawal,
                ColumnRole::Deposit,
            ]
        );
    }

    #[test]
    fn test_no_roles_reports_layout_unresolved() {
        let lines = vec![
            line(vec![tok("lorem", 20.0, 60.0, 100.0)]),
            line(vec![tok("ipsum", 20.0, 60.0, 120.0)]),
        ];
        let det = detect_columns(&lines, 612.0, &DetectorConfig::default());
        assert!(!det.is_resolved());
        assert!(det.specs().iter().all(|s| s.role == ColumnRole::Unknown));
    }

    #[test]
    fn test_empty_page_unresolved_single_unknown_column() {
        let det = detect_columns(&[], 612.0, &DetectorConfig::default());
        assert!(!det.is_resolved());
        assert_eq!(det.specs().len(), 1);
        assert_eq!(det.specs()[0].x_end, 612.0);
    }

    #[test]
    fn test_date_shapes() {
        assert!(is_date_shaped("03/04"));
        assert!(is_date_shaped("03/04/2024"));
        assert!(is_date_shaped("2024-03-04"));
        assert!(is_date_shaped("Jan 5"));
        assert!(is_date_shaped("Jan 5, 2024"));
        assert!(!is_date_shaped("COFFEE"));
        assert!(!is_date_shaped("1200.00"));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let lines = vec![header_line()];
        let a = detect_columns(&lines, 612.0, &DetectorConfig::default());
        let b = detect_columns(&lines, 612.0, &DetectorConfig::default());
        assert_eq!(a.specs(), b.specs());
    }
}
