use std::io::Write;
use std::path::Path;

use crate::classify::parse_amount;
use crate::columns::DetectorConfig;
use crate::error::Result;
use crate::export::export_all;
use crate::fmt::money;
use crate::models::Category;
use crate::reconstruct::reconstruct_statement;
use crate::render::format_statement;
use crate::table::TableModel;

const HELP: &str = "\
Commands:
  show                     print the tables
  edit <id> <column> <value>   change one cell (empty value clears it)
  move <id> <withdrawal|deposit>   assign a row to a category
  add <withdrawal|deposit>     append a blank row
  del <id>                 delete a row
  export <dir>             write CSV and JSON files
  done                     finish the session";

fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    let _ = std::io::stdout().flush();
    let mut input = String::new();
    match std::io::stdin().read_line(&mut input) {
        Ok(0) => None,
        Ok(_) => Some(input.trim().to_string()),
        Err(_) => None,
    }
}

fn category_from_str(name: &str) -> Option<Category> {
    match name.to_lowercase().as_str() {
        "withdrawal" | "withdrawals" | "w" => Some(Category::Withdrawal),
        "deposit" | "deposits" | "d" => Some(Category::Deposit),
        _ => None,
    }
}

fn apply(model: &mut TableModel, input: &str) -> Result<bool> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    match parts.as_slice() {
        [] => {}
        ["done"] | ["quit"] | ["q"] => return Ok(true),
        ["help"] => println!("{HELP}"),
        ["show"] => print!("{}", format_statement(model)),
        ["edit", id, column, rest @ ..] => {
            let id: u64 = id
                .parse()
                .map_err(|_| crate::error::TellerError::UnsupportedInput(format!("bad row id '{id}'")))?;
            let role = super::parse::role_from_str(column)?;
            let value = rest.join(" ");
            if role.is_amount() && !value.is_empty() && parse_amount(&value).is_none() {
                println!("'{value}' is not an amount; the row will need attention.");
            }
            model.edit_cell(id, role, &value)?;
        }
        ["move", id, category] => {
            let id: u64 = id
                .parse()
                .map_err(|_| crate::error::TellerError::UnsupportedInput(format!("bad row id '{id}'")))?;
            let target = category_from_str(category).ok_or_else(|| {
                crate::error::TellerError::UnsupportedInput(format!("unknown category '{category}'"))
            })?;
            model.move_row(id, target)?;
        }
        ["add", category] => {
            let target = category_from_str(category).ok_or_else(|| {
                crate::error::TellerError::UnsupportedInput(format!("unknown category '{category}'"))
            })?;
            let id = model.add_blank_row(target);
            println!("Added row {id}; fill it in with edit.");
        }
        ["del", id] => {
            let id: u64 = id
                .parse()
                .map_err(|_| crate::error::TellerError::UnsupportedInput(format!("bad row id '{id}'")))?;
            model.delete_row(id)?;
        }
        ["export", dir] => {
            for p in export_all(model, Path::new(dir))? {
                println!("Wrote {}", p.display());
            }
        }
        _ => println!("Unrecognized command; try help."),
    }
    Ok(false)
}

/// Parse a statement, then edit the reconstructed tables interactively.
/// Totals are reprinted after every change.
pub fn run(file: &str) -> Result<()> {
    let pages = super::parse::load_pages(Path::new(file))?;
    let (mut model, report) = reconstruct_statement(&pages, &DetectorConfig::default());

    if report.layout_unresolved() {
        println!("Columns could not be detected; rows are in the needs-attention list.");
    }
    model.subscribe(Box::new(|totals| {
        println!(
            "Totals: withdrawals {} / deposits {}",
            money(totals.withdrawals),
            money(totals.deposits)
        );
    }));
    print!("{}", format_statement(&model));
    println!("{HELP}");

    loop {
        let Some(input) = prompt("> ") else {
            break;
        };
        match apply(&mut model, &input) {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    print!("{}", format_statement(&model));
    Ok(())
}
