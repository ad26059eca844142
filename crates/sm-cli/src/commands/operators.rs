//! Operator directory commands.

use std::fmt::{self, Write};

use anyhow::Result;
use sm_core::{Operator, OperatorId};
use sm_db::Database;

/// Adds or renames an operator.
pub fn add(db: &Database, id: &str, name: &str) -> Result<()> {
    let id = OperatorId::new(id.trim())?;
    db.add_operator(&id, name)?;
    println!("Saved operator {id}: {}", name.trim());
    Ok(())
}

/// Formats the directory as a two-column table.
pub fn format_operators(operators: &[Operator]) -> Result<String, fmt::Error> {
    let mut output = String::new();
    if operators.is_empty() {
        writeln!(output, "No operators registered.")?;
        writeln!(output)?;
        writeln!(output, "Hint: Run 'sm operators add <ID> <NAME>' to add one.")?;
        return Ok(output);
    }

    writeln!(output, "{:<12}NAME", "ID")?;
    for operator in operators {
        writeln!(output, "{:<12}{}", operator.id.as_str(), operator.name)?;
    }
    Ok(output)
}

/// Lists every operator.
pub fn list(db: &Database, json: bool) -> Result<()> {
    let operators = db.list_operators()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&operators)?);
    } else {
        print!("{}", format_operators(&operators)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_format_operators() {
        let operators = vec![
            Operator {
                id: OperatorId::new("A17").unwrap(),
                name: "Asha".to_string(),
            },
            Operator {
                id: OperatorId::new("B204").unwrap(),
                name: "Dana Okafor".to_string(),
            },
        ];
        assert_snapshot!(format_operators(&operators).unwrap(), @r"
        ID          NAME
        A17         Asha
        B204        Dana Okafor
        ");
    }

    #[test]
    fn test_format_empty_directory() {
        let output = format_operators(&[]).unwrap();
        assert!(output.starts_with("No operators registered."));
    }

    #[test]
    fn test_add_then_list() {
        let db = Database::open_in_memory().unwrap();
        add(&db, " A17 ", "Asha").unwrap();
        add(&db, "A17", "Asha K").unwrap();
        let operators = db.list_operators().unwrap();
        assert_eq!(operators.len(), 1);
        assert_eq!(operators[0].name, "Asha K");
        assert!(add(&db, "B2", "  ").is_err());
    }
}
