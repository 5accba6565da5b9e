use arrears::application::aggregator::{UnpaidInvoices, sort_by_total_desc};
use arrears::application::dispatch::{CancellationToken, DispatchPipeline};
use arrears::application::overdue::compute_overdue;
use arrears::application::planner::{NotificationPlanner, TargetPlan, management_targets};
use arrears::config::Settings;
use arrears::domain::overdue::CustomerOverdueAggregate;
use arrears::infrastructure::channels::{ChannelKind, build_channel};
use arrears::infrastructure::in_memory::InMemoryCustomerDirectory;
use arrears::interfaces::csv::aggregate_writer::AggregateWriter;
use arrears::interfaces::csv::reader::{
    read_contracts, read_directory, read_invoices, read_payments,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file (dispatch pacing, report layout, webhook)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Inputs {
    /// Contracts CSV: id,customer_id,customer_name,schedule
    #[arg(long)]
    contracts: PathBuf,

    /// Payments CSV: contract_id,amount,paid_at
    #[arg(long)]
    payments: PathBuf,

    /// Unpaid invoices CSV: customer_id,customer_name,contract_id,amount,created_at,days_overdue
    #[arg(long)]
    invoices: Option<PathBuf>,

    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct Delivery {
    /// console, outbox or webhook
    #[arg(long, default_value = "console")]
    channel: ChannelKind,

    /// File the outbox channel appends to
    #[arg(long)]
    outbox: Option<PathBuf>,

    /// Pause between sends in milliseconds
    #[arg(long, allow_negative_numbers = true)]
    delay_ms: Option<i64>,

    /// Per-send timeout in milliseconds
    #[arg(long, allow_negative_numbers = true)]
    timeout_ms: Option<i64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Csv,
    Text,
}

#[derive(Subcommand)]
enum Command {
    /// Print per-customer overdue totals
    Report {
        #[command(flatten)]
        inputs: Inputs,

        #[arg(long, value_enum, default_value_t = ReportFormat::Csv)]
        format: ReportFormat,
    },
    /// Send each overdue customer their statement
    Notify {
        #[command(flatten)]
        inputs: Inputs,

        /// Customer directory CSV: customer_id,customer_name,phone
        #[arg(long)]
        directory: PathBuf,

        #[command(flatten)]
        delivery: Delivery,
    },
    /// Send the management report to one or more phones
    Summary {
        #[command(flatten)]
        inputs: Inputs,

        #[arg(long = "manager-phone", required = true)]
        manager_phones: Vec<String>,

        #[command(flatten)]
        delivery: Delivery,
    },
}

fn load_aggregates(inputs: &Inputs) -> Result<Vec<CustomerOverdueAggregate>> {
    let contracts = read_contracts(&inputs.contracts).into_diagnostic()?;
    let payments = read_payments(&inputs.payments).into_diagnostic()?;
    let unpaid = match &inputs.invoices {
        Some(path) => read_invoices(path).into_diagnostic()?,
        None => UnpaidInvoices::new(),
    };
    let reference_date = inputs
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let computation = compute_overdue(&contracts, &payments, &unpaid, reference_date);
    let errors = computation.data_errors;
    if errors.malformed_schedules + errors.dropped_entries > 0 {
        eprintln!(
            "Skipped {} malformed schedules and {} installments without due date",
            errors.malformed_schedules, errors.dropped_entries
        );
    }
    if errors.overflowed_pools > 0 {
        eprintln!(
            "Skipped {} contracts whose payment total is out of range",
            errors.overflowed_pools
        );
    }
    for collision in &computation.collisions {
        eprintln!(
            "WARNING: {} has no customer id and appears on contracts {}",
            collision.identity_key,
            collision.contract_ids.join(", ")
        );
    }

    let mut aggregates = computation.aggregates;
    sort_by_total_desc(&mut aggregates);
    Ok(aggregates)
}

async fn deliver(settings: &mut Settings, delivery: Delivery, plan: TargetPlan) -> Result<()> {
    if let Some(path) = delivery.outbox {
        settings.outbox_path = path;
    }
    if let Some(delay_ms) = delivery.delay_ms {
        settings.dispatch.delay_ms = delay_ms;
    }
    if let Some(timeout_ms) = delivery.timeout_ms {
        settings.dispatch.timeout_ms = timeout_ms;
    }
    let options = settings.dispatch_options().into_diagnostic()?;
    let channel = build_channel(delivery.channel, settings).into_diagnostic()?;

    for key in &plan.unresolved {
        eprintln!("No phone for {key}, not notified");
    }
    if plan.targets.is_empty() {
        eprintln!("Nothing to send");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, stopping after the current send");
            on_interrupt.cancel();
        }
    });

    let pipeline = DispatchPipeline::new(channel.as_ref(), options);
    let report = pipeline.run(&plan.targets, &cancel).await.into_diagnostic()?;

    eprintln!("{}", report.summary());
    for id in report.failed_ids() {
        eprintln!("Failed: {id}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut settings = Settings::load_or_default(cli.config.as_deref()).into_diagnostic()?;

    match cli.command {
        Command::Report { inputs, format } => {
            let aggregates = load_aggregates(&inputs)?;
            match format {
                ReportFormat::Csv => {
                    let stdout = io::stdout();
                    let mut writer = AggregateWriter::new(stdout.lock());
                    writer.write_aggregates(&aggregates).into_diagnostic()?;
                }
                ReportFormat::Text => {
                    println!("{}", settings.composer().management_report(&aggregates));
                }
            }
        }
        Command::Notify {
            inputs,
            directory,
            delivery,
        } => {
            let aggregates = load_aggregates(&inputs)?;
            let entries = read_directory(&directory).into_diagnostic()?;
            let directory = InMemoryCustomerDirectory::from_entries(entries);
            let composer = settings.composer();
            let plan = NotificationPlanner::new(&directory, &composer)
                .customer_targets(&aggregates)
                .await;
            deliver(&mut settings, delivery, plan).await?;
        }
        Command::Summary {
            inputs,
            manager_phones,
            delivery,
        } => {
            let aggregates = load_aggregates(&inputs)?;
            let plan = management_targets(&settings.composer(), &aggregates, &manager_phones);
            deliver(&mut settings, delivery, plan).await?;
        }
    }

    Ok(())
}
