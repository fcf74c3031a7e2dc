// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod commands;

use chrono::NaiveDate;
use clap::{error::ErrorKind, ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Generator, Shell};
use referral_desk_core::{ExitCode, MachineError};
use referral_desk_model::{parse_iso_day, LeadSource, LevelOfCare, UNKNOWN_ACTOR};
use referral_desk_query::{GroupBy, GroupColumn, MetricsFilter, ReferralFilter, SortDirection, SortKey};
use referral_desk_store::MAX_BATCH_SIZE;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

pub const CRATE_NAME: &str = "referral-desk-cli";

#[derive(Parser)]
#[command(name = "referral-desk")]
#[command(about = "Referral desk operations CLI", version)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and schema.
    InitDb {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Bulk-load referrals from a spreadsheet export.
    Import {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = MAX_BATCH_SIZE)]
        batch_size: usize,
        #[arg(long, value_enum)]
        default_lead_source: Option<LeadSourceCli>,
        #[arg(long, default_value = UNKNOWN_ACTOR)]
        actor: String,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Write matching referrals as CSV.
    Export {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        filter: ReferralFilterArgs,
        #[arg(long, value_enum, default_value_t = SortKeyCli::Date)]
        sort: SortKeyCli,
        #[arg(long, value_enum, default_value_t = DirectionCli::Desc)]
        direction: DirectionCli,
    },
    /// Conversion report over the filtered referrals.
    Metrics {
        #[arg(long)]
        db: Option<PathBuf>,
        #[command(flatten)]
        filter: MetricsFilterArgs,
        #[arg(long, value_enum)]
        group_by: Option<GroupByCli>,
        #[arg(long, value_enum, default_value_t = GroupColumnCli::Total)]
        sort: GroupColumnCli,
        #[arg(long, value_enum, default_value_t = DirectionCli::Desc)]
        direction: DirectionCli,
        /// Write one group table as CSV (lead source unless --group-by is given).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    InspectDb {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct ReferralFilterArgs {
    #[arg(long, value_enum)]
    program: Option<ProgramCli>,
    #[arg(long)]
    admitted: Option<bool>,
    #[arg(long)]
    referral_sent_to: Option<String>,
    #[arg(long, value_enum)]
    lead_source: Option<LeadSourceCli>,
    #[arg(long)]
    outreach_rep: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    referral_source: Option<String>,
    #[arg(long)]
    insurance_company: Option<String>,
    #[arg(long, value_parser = parse_day)]
    created_from: Option<NaiveDate>,
    #[arg(long, value_parser = parse_day)]
    created_to: Option<NaiveDate>,
}

impl ReferralFilterArgs {
    fn into_filter(self) -> ReferralFilter {
        ReferralFilter {
            program: self.program.map(Into::into),
            admitted: self.admitted,
            referral_sent_to: self.referral_sent_to,
            lead_source: self.lead_source.map(Into::into),
            outreach_rep: self.outreach_rep,
            name: self.name,
            referral_source: self.referral_source,
            insurance_company: self.insurance_company,
            created_from: self.created_from,
            created_to: self.created_to,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
struct MetricsFilterArgs {
    #[arg(long, value_parser = parse_day)]
    created_from: Option<NaiveDate>,
    #[arg(long, value_parser = parse_day)]
    created_to: Option<NaiveDate>,
    #[arg(long, value_enum)]
    program: Option<ProgramCli>,
    #[arg(long)]
    referral_source: Option<String>,
    #[arg(long)]
    referral_sent_to: Option<String>,
    #[arg(long, value_enum)]
    lead_source: Option<LeadSourceCli>,
    #[arg(long)]
    outreach_rep: Option<String>,
}

impl MetricsFilterArgs {
    fn into_filter(self) -> MetricsFilter {
        MetricsFilter {
            created_from: self.created_from,
            created_to: self.created_to,
            program: self.program.map(Into::into),
            referral_source: self.referral_source,
            referral_sent_to: self.referral_sent_to,
            lead_source: self.lead_source.map(Into::into),
            outreach_rep: self.outreach_rep,
        }
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    parse_iso_day(raw.trim()).ok_or_else(|| format!("expected YYYY-MM-DD, got {raw}"))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LeadSourceCli {
    Insurance,
    Kaiser,
    Outreach,
    Direct,
}

impl From<LeadSourceCli> for LeadSource {
    fn from(value: LeadSourceCli) -> Self {
        match value {
            LeadSourceCli::Insurance => Self::Insurance,
            LeadSourceCli::Kaiser => Self::Kaiser,
            LeadSourceCli::Outreach => Self::Outreach,
            LeadSourceCli::Direct => Self::Direct,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProgramCli {
    Dtx,
    Rtc,
    Php,
    Iop,
}

impl From<ProgramCli> for LevelOfCare {
    fn from(value: ProgramCli) -> Self {
        match value {
            ProgramCli::Dtx => Self::Dtx,
            ProgramCli::Rtc => Self::Rtc,
            ProgramCli::Php => Self::Php,
            ProgramCli::Iop => Self::Iop,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupByCli {
    LeadSource,
    ReferralSource,
    ReferralSentTo,
    OutreachRep,
    Program,
    InsuranceCompany,
}

impl From<GroupByCli> for GroupBy {
    fn from(value: GroupByCli) -> Self {
        match value {
            GroupByCli::LeadSource => Self::LeadSource,
            GroupByCli::ReferralSource => Self::ReferralSource,
            GroupByCli::ReferralSentTo => Self::ReferralSentTo,
            GroupByCli::OutreachRep => Self::OutreachRep,
            GroupByCli::Program => Self::Program,
            GroupByCli::InsuranceCompany => Self::InsuranceCompany,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupColumnCli {
    Key,
    Total,
    Admitted,
    Rate,
}

impl From<GroupColumnCli> for GroupColumn {
    fn from(value: GroupColumnCli) -> Self {
        match value {
            GroupColumnCli::Key => Self::Key,
            GroupColumnCli::Total => Self::Total,
            GroupColumnCli::Admitted => Self::Admitted,
            GroupColumnCli::Rate => Self::Rate,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortKeyCli {
    Date,
    Name,
}

impl From<SortKeyCli> for SortKey {
    fn from(value: SortKeyCli) -> Self {
        match value {
            SortKeyCli::Date => Self::Date,
            SortKeyCli::Name => Self::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionCli {
    Asc,
    Desc,
}

impl From<DirectionCli> for SortDirection {
    fn from(value: DirectionCli) -> Self {
        match value {
            DirectionCli::Asc => Self::Asc,
            DirectionCli::Desc => Self::Desc,
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    pub(crate) json: bool,
    pub(crate) quiet: bool,
}

#[derive(Debug)]
pub(crate) struct CliError {
    pub(crate) exit_code: ExitCode,
    pub(crate) machine: MachineError,
}

impl CliError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError::new("internal_error", &message.into()),
        }
    }

    pub(crate) fn dependency(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::DependencyFailure,
            machine: MachineError::new("dependency_failure", &message.into()),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Validation,
            machine: MachineError::new("validation_error", &message.into()),
        }
    }
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError {
                    exit_code: ExitCode::Usage,
                    machine: MachineError::new("usage_error", "invalid command line arguments")
                        .with_detail("error", &err.to_string()),
                });
            }
        },
    };
    init_logging(cli.quiet, cli.verbose);
    let output = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
    };

    let command = cli.command.ok_or_else(|| CliError {
        exit_code: ExitCode::Usage,
        machine: MachineError::new("usage_error", "missing command; see --help"),
    })?;

    match command {
        Commands::InitDb { db } => commands::init_db(&resolve_db(db), output),
        Commands::Import {
            db,
            csv,
            batch_size,
            default_lead_source,
            actor,
            dry_run,
        } => commands::import(
            &resolve_db(db),
            &csv,
            referral_desk_ingest::ImportOptions {
                batch_size,
                default_lead_source: default_lead_source.map(Into::into),
                actor,
                dry_run,
            },
            output,
        ),
        Commands::Export {
            db,
            out,
            filter,
            sort,
            direction,
        } => commands::export(
            &resolve_db(db),
            out.as_deref(),
            &filter.into_filter(),
            sort.into(),
            direction.into(),
            output,
        ),
        Commands::Metrics {
            db,
            filter,
            group_by,
            sort,
            direction,
            out,
        } => commands::metrics(
            &resolve_db(db),
            &commands::MetricsArgs {
                filter: filter.into_filter(),
                group_by: group_by.map(Into::into),
                sort: sort.into(),
                direction: direction.into(),
                out,
            },
            output,
        ),
        Commands::InspectDb { db } => commands::inspect_db(&resolve_db(db), output),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    }
}

fn resolve_db(db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(referral_desk_core::default_db_path)
}

/// Logs go to stderr so stdout stays clean for CSV and JSON.
fn init_logging(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_completion<G: Generator>(generator: G) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(generator, &mut command, name, &mut std::io::stdout());
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn value_enum_mirrors_cover_every_domain_variant() {
        let leads: Vec<LeadSource> = LeadSourceCli::value_variants()
            .iter()
            .map(|v| LeadSource::from(*v))
            .collect();
        assert_eq!(leads, LeadSource::ALL.to_vec());
        let programs: Vec<LevelOfCare> = ProgramCli::value_variants()
            .iter()
            .map(|v| LevelOfCare::from(*v))
            .collect();
        assert_eq!(programs, LevelOfCare::ALL.to_vec());
        let groups: Vec<GroupBy> = GroupByCli::value_variants()
            .iter()
            .map(|v| GroupBy::from(*v))
            .collect();
        assert_eq!(groups, GroupBy::ALL.to_vec());
    }

    #[test]
    fn dates_parse_as_calendar_days() {
        assert_eq!(
            parse_day("2024-02-29"),
            Ok(NaiveDate::from_ymd_opt(2024, 2, 29).expect("date"))
        );
        assert!(parse_day("02/29/2024").is_err());
        assert!(parse_day("24-02-29").is_err());
        assert!(parse_day("+12024-02-29").is_err());
    }

    #[test]
    fn filter_args_map_onto_query_filter() {
        let filter = ReferralFilterArgs {
            program: Some(ProgramCli::Php),
            lead_source: Some(LeadSourceCli::Kaiser),
            name: Some("ada".to_string()),
            ..ReferralFilterArgs::default()
        }
        .into_filter();
        assert_eq!(filter.program, Some(LevelOfCare::Php));
        assert_eq!(filter.lead_source, Some(LeadSource::Kaiser));
        assert_eq!(filter.name.as_deref(), Some("ada"));
        assert_eq!(filter.admitted, None);
    }
}
