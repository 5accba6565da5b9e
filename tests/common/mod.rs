#![allow(dead_code)]

use std::io::Error;
use std::path::{Path, PathBuf};

/// Reference date used by every fixture.
pub const TODAY: &str = "2024-06-15";

pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<&str>]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Two contracts for customer 7, one for customer 8 and a name-only customer.
///
/// As of `TODAY`:
/// - C1: 100 due 06-05 and 100 due 06-20, 60 paid -> 40 overdue, 10 days
/// - C2: 50 due 05-26 and 50 due 06-05, 80 paid   -> 20 overdue, 10 days
/// - C3: 30 due 06-14, nothing paid               -> 30 overdue, 1 day
/// - C4: no customer id, 25 due 05-16             -> 25 overdue, 30 days
pub fn write_portfolio(dir: &Path) -> Result<(PathBuf, PathBuf), Error> {
    let contracts = dir.join("contracts.csv");
    let payments = dir.join("payments.csv");

    write_csv(
        &contracts,
        &["id", "customer_id", "customer_name", "schedule"],
        &[
            vec![
                "C1",
                "7",
                "Ana Silva",
                r#"[{"amount":100,"due_date":"2024-06-05","description":"1/2"},{"amount":100,"due_date":"2024-06-20","description":"2/2"}]"#,
            ],
            vec![
                "C2",
                "7",
                "Ana Silva",
                r#"[{"amount":50,"due_date":"2024-05-26"},{"amount":50,"due_date":"2024-06-05"}]"#,
            ],
            vec![
                "C3",
                "8",
                "Bruno Lima",
                r#"[{"amount":30,"due_date":"2024-06-14"}]"#,
            ],
            vec!["C4", "", "Caio Souza", r#"[{"amount":25,"due_date":"2024-05-16"}]"#],
        ],
    )?;

    write_csv(
        &payments,
        &["contract_id", "amount", "paid_at"],
        &[
            vec!["C1", "60", "2024-06-01"],
            vec!["C2", "50", "2024-05-20"],
            vec!["C2", "30", "2024-06-01"],
        ],
    )?;

    Ok((contracts, payments))
}

/// Phones for customers 7 and 8; Caio has none.
pub fn write_directory(dir: &Path) -> Result<PathBuf, Error> {
    let path = dir.join("directory.csv");
    write_csv(
        &path,
        &["customer_id", "customer_name", "phone"],
        &[vec!["7", "Ana Silva", "+100"], vec!["8", "Bruno Lima", "+200"]],
    )?;
    Ok(path)
}
