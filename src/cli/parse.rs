use std::path::Path;

use log::info;

use crate::columns::DetectorConfig;
use crate::error::{Result, TellerError};
use crate::export::{export_all, tsv_string};
use crate::models::{ColumnRole, PageTokens, RawPage};
use crate::reconstruct::{reassemble_with_mapping, reconstruct_statement};
use crate::render::format_statement;

pub(crate) fn role_from_str(name: &str) -> Result<ColumnRole> {
    match name.to_lowercase().as_str() {
        "date" => Ok(ColumnRole::Date),
        "description" => Ok(ColumnRole::Description),
        "withdrawal" => Ok(ColumnRole::Withdrawal),
        "deposit" => Ok(ColumnRole::Deposit),
        "balance" => Ok(ColumnRole::Balance),
        "unknown" => Ok(ColumnRole::Unknown),
        other => Err(TellerError::UnsupportedInput(format!(
            "unknown column role '{other}' (expected date, description, withdrawal, deposit, balance or unknown)"
        ))),
    }
}

/// Parse `--map` arguments of the form INDEX=ROLE.
fn parse_mapping(map: &[String]) -> Result<Vec<(usize, ColumnRole)>> {
    let mut overrides = Vec::new();
    for entry in map {
        let (idx, role) = entry.split_once('=').ok_or_else(|| {
            TellerError::UnsupportedInput(format!("bad --map '{entry}' (expected INDEX=ROLE)"))
        })?;
        let idx: usize = idx.trim().parse().map_err(|_| {
            TellerError::UnsupportedInput(format!("bad column index in --map '{entry}'"))
        })?;
        overrides.push((idx, role_from_str(role.trim())?));
    }
    Ok(overrides)
}

/// Load extracted-token pages from a statement file, by extension.
pub(crate) fn load_pages(path: &Path) -> Result<Vec<PageTokens>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match ext.as_str() {
        "json" => {
            let file = std::fs::File::open(path)?;
            let raw: Vec<RawPage> = serde_json::from_reader(file)?;
            Ok(raw.into_iter().map(PageTokens::from).collect())
        }
        #[cfg(feature = "pdf")]
        "pdf" => crate::pdf::extract_pages(path),
        #[cfg(not(feature = "pdf"))]
        "pdf" => Err(TellerError::UnsupportedInput(
            "PDF input requires the pdf feature".into(),
        )),
        other => Err(TellerError::UnsupportedInput(format!(
            "unsupported statement file '.{other}' (expected .json or .pdf)"
        ))),
    }
}

pub fn run(file: &str, map: &[String], output_dir: Option<String>, tsv: bool) -> Result<()> {
    let path = Path::new(file);
    let pages = load_pages(path)?;
    let overrides = parse_mapping(map)?;
    let config = DetectorConfig::default();

    let (model, report) = if overrides.is_empty() {
        reconstruct_statement(&pages, &config)
    } else {
        reassemble_with_mapping(&pages, &overrides, &config)
    };

    for (i, page) in report.pages.iter().enumerate() {
        info!(
            "page {}: {:?}, {} rows, {} transactions, {} unresolved",
            i + 1,
            page.layout,
            page.rows,
            page.transactions,
            page.unresolved
        );
    }

    if report.layout_unresolved() {
        eprintln!("Could not detect columns; rows are listed for manual mapping (--map INDEX=ROLE).");
    }
    if tsv {
        print!("{}", tsv_string(model.withdrawals()));
        println!();
        print!("{}", tsv_string(model.deposits()));
    } else {
        print!("{}", format_statement(&model));
    }

    if let Some(dir) = output_dir {
        let written = export_all(&model, Path::new(&dir))?;
        for p in written {
            println!("Wrote {}", p.display());
        }
    }

    Ok(())
}
