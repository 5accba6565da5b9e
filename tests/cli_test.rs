mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_report_csv_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("report")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--date")
        .arg(common::TODAY);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "customer,customer_name,total_overdue,overdue_count,oldest_days_overdue,unpaid_invoices",
        ))
        .stdout(predicate::str::contains("id:7,Ana Silva,60.00,2,10,0"))
        .stdout(predicate::str::contains("id:8,Bruno Lima,30.00,1,1,0"))
        .stdout(predicate::str::contains("name:caio souza,Caio Souza,25.00,1,30,0"));

    Ok(())
}

#[test]
fn test_report_is_sorted_by_total() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;

    let output = Command::new(cargo_bin!("arrears"))
        .arg("report")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--date")
        .arg(common::TODAY)
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let customers: Vec<&str> = stdout
        .lines()
        .skip(1)
        .filter_map(|l| l.split(',').next())
        .collect();

    assert_eq!(customers, vec!["id:7", "id:8", "name:caio souza"]);
    Ok(())
}

#[test]
fn test_report_text_with_invoices() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;
    let invoices = dir.path().join("invoices.csv");
    common::write_csv(
        &invoices,
        &["customer_id", "customer_name", "contract_id", "amount", "created_at", "days_overdue"],
        &[vec!["8", "Bruno Lima", "C3", "45.50", "2024-05-01", "45"]],
    )?;

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("report")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--invoices")
        .arg(&invoices)
        .arg("--date")
        .arg(common::TODAY)
        .arg("--format")
        .arg("text");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Overdue customers: 3"))
        .stdout(predicate::str::contains(
            "1. Bruno Lima: $ 75.50, oldest 1 day overdue, 1 installment",
        ))
        .stdout(predicate::str::contains("Grand total: $ 160.50"));

    Ok(())
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("report")
        .arg("--contracts")
        .arg("does-not-exist.csv")
        .arg("--payments")
        .arg("does-not-exist.csv");

    cmd.assert().failure();
}
