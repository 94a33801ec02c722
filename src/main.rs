mod cash_basis;
mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod ledger;
mod models;
mod normalize;
#[cfg(feature = "pdf")]
mod pdf;
mod reports;
mod rules;
mod settings;
mod sheet;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, FamilyCommands, ReportCommands, RulesCommands, TxnCommands};
use error::Result;
use settings::{load_settings, Settings};

/// `CAIXA_LOG` wins, then the `log_level` setting. `--verbose` forces debug
/// output for this crate.
fn init_tracing(settings: &Settings, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("caixa=debug")
    } else {
        EnvFilter::try_from_env("CAIXA_LOG")
            .or_else(|_| EnvFilter::try_new(&settings.log_level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(settings: Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Init { data_dir } => cli::init::run(settings, data_dir),
        Commands::Family { command } => match command {
            FamilyCommands::Add { name } => cli::family::add(&settings, &name),
            FamilyCommands::List => cli::family::list(&settings),
        },
        Commands::Import {
            file,
            family,
            format,
            kind,
            year,
            accept,
            categories,
            learn,
        } => cli::import::run(
            &settings,
            cli::import::ImportArgs {
                file,
                family,
                format,
                kind,
                year,
                accept,
                categories,
                learn,
            },
        ),
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                keyword,
                family,
                category,
            } => cli::rules::add(&settings, &keyword, &family, &category),
            RulesCommands::List { family } => cli::rules::list(&settings, &family),
            RulesCommands::Delete { keyword, family } => cli::rules::delete(&settings, &keyword, &family),
        },
        Commands::Categories => cli::categories::list(&settings),
        Commands::Categorize { family } => cli::categorize::run(&settings, &family),
        Commands::Txn { command } => match command {
            TxnCommands::Add {
                family,
                date,
                amount,
                description,
                method,
                category,
            } => cli::txn::add(
                &settings,
                cli::txn::AddArgs {
                    family,
                    date,
                    amount,
                    description,
                    method,
                    category,
                },
            ),
            TxnCommands::List {
                family,
                month,
                pending,
            } => cli::txn::list(&settings, &family, month.as_deref(), pending),
        },
        Commands::Settle { id, date } => cli::settle::run(&settings, id, &date),
        Commands::PayInvoice {
            family,
            closing,
            paid,
        } => cli::settle::invoice(&settings, &family, &closing, &paid),
        Commands::Report { command } => match command {
            ReportCommands::Month { family, month } => cli::report::month(&settings, &family, &month),
            ReportCommands::Pending { family } => cli::report::pending(&settings, &family),
        },
        Commands::Status => cli::status::run(&settings),
    }
}

fn main() {
    let cli = Cli::parse();

    let result = load_settings().and_then(|settings| {
        init_tracing(&settings, cli.verbose);
        dispatch(settings, cli.command)
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
