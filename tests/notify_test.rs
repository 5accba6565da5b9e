mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_notify_console_skips_customers_without_phone() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;
    let directory = common::write_directory(dir.path())?;

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("notify")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--directory")
        .arg(&directory)
        .arg("--date")
        .arg(common::TODAY)
        .arg("--delay-ms")
        .arg("0");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--- to +100 ---"))
        .stdout(predicate::str::contains("Hello, Ana Silva."))
        .stdout(predicate::str::contains("Total overdue: $ 60.00"))
        .stdout(predicate::str::contains("--- to +200 ---"))
        .stdout(predicate::str::contains("Caio").not())
        .stderr(predicate::str::contains("No phone for name:caio souza"))
        .stderr(predicate::str::contains("2 succeeded, 0 failed"));

    Ok(())
}

#[test]
fn test_notify_outbox_channel() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;
    let directory = common::write_directory(dir.path())?;
    let outbox = dir.path().join("outbox.jsonl");

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("notify")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--directory")
        .arg(&directory)
        .arg("--date")
        .arg(common::TODAY)
        .arg("--channel")
        .arg("outbox")
        .arg("--outbox")
        .arg(&outbox)
        .arg("--delay-ms")
        .arg("0");

    cmd.assert().success();

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&outbox)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["phone"], "+100");
    assert!(lines[1]["text"].as_str().unwrap_or_default().contains("Bruno Lima"));

    Ok(())
}

#[test]
fn test_negative_delay_is_rejected_before_sending() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;
    let directory = common::write_directory(dir.path())?;

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("notify")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--directory")
        .arg(&directory)
        .arg("--date")
        .arg(common::TODAY)
        .arg("--delay-ms")
        .arg("-10");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("--- to").not())
        .stderr(predicate::str::contains("must not be negative"));

    Ok(())
}

#[test]
fn test_summary_goes_to_managers() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;
    let config = dir.path().join("settings.json");
    std::fs::write(
        &config,
        r#"{"dispatch": {"delay_ms": 0}, "report": {"limit": 1, "currency_symbol": "R$"}}"#,
    )?;

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("summary")
        .arg("--config")
        .arg(&config)
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--date")
        .arg(common::TODAY)
        .arg("--manager-phone")
        .arg("+900")
        .arg("--manager-phone")
        .arg("+901");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--- to +900 ---"))
        .stdout(predicate::str::contains("--- to +901 ---"))
        .stdout(predicate::str::contains("1. Ana Silva: R$ 60.00"))
        .stdout(predicate::str::contains("... and 2 more not listed"))
        .stdout(predicate::str::contains("Grand total: R$ 115.00"))
        .stderr(predicate::str::contains("2 succeeded, 0 failed"));

    Ok(())
}

#[test]
fn test_webhook_without_configuration_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("summary")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--date")
        .arg(common::TODAY)
        .arg("--manager-phone")
        .arg("+900")
        .arg("--channel")
        .arg("webhook");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no webhook url configured"));

    Ok(())
}

#[test]
fn test_invalid_delay_fails_with_nobody_reachable() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;
    let directory = dir.path().join("empty_directory.csv");
    common::write_csv(&directory, &["customer_id", "customer_name", "phone"], &[])?;

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("notify")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--directory")
        .arg(&directory)
        .arg("--date")
        .arg(common::TODAY)
        .arg("--delay-ms")
        .arg("-1");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must not be negative"))
        .stderr(predicate::str::contains("Nothing to send").not());

    Ok(())
}

#[test]
fn test_repeated_manager_phone_gets_one_message() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (contracts, payments) = common::write_portfolio(dir.path())?;

    let mut cmd = Command::new(cargo_bin!("arrears"));
    cmd.arg("summary")
        .arg("--contracts")
        .arg(&contracts)
        .arg("--payments")
        .arg(&payments)
        .arg("--date")
        .arg(common::TODAY)
        .arg("--delay-ms")
        .arg("0")
        .arg("--manager-phone")
        .arg("+900")
        .arg("--manager-phone")
        .arg("+900");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--- to +900 ---").count(1))
        .stderr(predicate::str::contains("1 succeeded, 0 failed"));

    Ok(())
}
