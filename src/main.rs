use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::error;

use motoring_buchhaltung::commands;
use motoring_buchhaltung::db;
use motoring_buchhaltung::domain::period::{PeriodFilter, SubPeriod, YearMonth};
use motoring_buchhaltung::error::AppError;
use motoring_buchhaltung::logging;
use motoring_buchhaltung::models::*;
use motoring_buchhaltung::reports::AggregationRequest;
use motoring_buchhaltung::AppState;

#[derive(Parser)]
#[command(name = "motoring", about = "Pembukuan harian ojek: order, bensin, sparepart, tutup buku")]
struct Cli {
  /// Data directory holding the database, exports and backups.
  #[arg(long, env = "MOTORING_DATA_DIR", global = true)]
  data_dir: Option<PathBuf>,

  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  Login { id: String, email: String },
  Logout,
  Whoami,
  #[command(subcommand)]
  Settings(SettingsCommand),
  #[command(subcommand)]
  Motor(MotorCommand),
  #[command(subcommand)]
  Order(OrderCommand),
  #[command(subcommand)]
  Part(PartCommand),
  #[command(subcommand)]
  Fuel(FuelCommand),
  #[command(subcommand)]
  Km(KmCommand),
  /// Close one half-month period into the ledger.
  Close {
    month: YearMonth,
    sub: SubPeriod,
  },
  Ledger,
  Dashboard {
    #[arg(long)]
    motor: Option<i64>,
    #[arg(long)]
    month: Option<YearMonth>,
    #[arg(long, default_value = "all")]
    period: PeriodFilter,
  },
  /// Plain-text recap of open orders.
  Report {
    month: YearMonth,
    #[arg(long, default_value = "all")]
    period: PeriodFilter,
    #[arg(long)]
    amounts: bool,
  },
  Reminders { motor: i64 },
  #[command(subcommand)]
  Export(ExportCommand),
  Backup {
    #[arg(long, value_enum, default_value_t = KindArg::Full)]
    kind: KindArg,
    #[arg(long)]
    output: Option<PathBuf>,
  },
  Restore {
    path: PathBuf,
    /// Keep going past failing records instead of rolling back.
    #[arg(long)]
    best_effort: bool,
  },
  Audit {
    #[arg(long, default_value_t = 1)]
    page: i64,
    #[arg(long, default_value_t = 50)]
    page_size: i64,
  },
}

#[derive(Subcommand)]
enum SettingsCommand {
  Show,
  Set {
    #[arg(long)]
    warning_km: Option<f64>,
    #[arg(long)]
    currency: Option<String>,
  },
}

#[derive(Subcommand)]
enum MotorCommand {
  Add { name: String, model: String, year: String },
  List,
  Delete { id: i64 },
}

#[derive(Args)]
struct OrderArgs {
  #[arg(long)]
  qty: f64,
  #[arg(long)]
  rate: f64,
  #[arg(long)]
  date: String,
  #[arg(long)]
  note: Option<String>,
  #[arg(long)]
  label: Option<OrderLabel>,
}

impl From<OrderArgs> for OrderInput {
  fn from(args: OrderArgs) -> Self {
    OrderInput {
      quantity: args.qty,
      unit_rate: args.rate,
      date: args.date,
      note: args.note,
      label: args.label,
    }
  }
}

#[derive(Subcommand)]
enum OrderCommand {
  Add(OrderArgs),
  Update {
    id: i64,
    #[command(flatten)]
    order: OrderArgs,
  },
  Delete { id: i64 },
  List {
    #[arg(long)]
    month: Option<YearMonth>,
  },
  /// Orders behind a ledger entry.
  Closed { period_id: i64 },
}

#[derive(Args)]
struct PartArgs {
  #[arg(long)]
  motor: i64,
  #[arg(long)]
  name: String,
  #[arg(long, default_value_t = 1.0)]
  qty: f64,
  #[arg(long)]
  price: f64,
  #[arg(long, default_value_t = 0.0)]
  current_km: f64,
  #[arg(long, default_value_t = 0.0)]
  next_km: f64,
  #[arg(long)]
  date: String,
  #[arg(long)]
  note: Option<String>,
}

impl From<PartArgs> for SparePartInput {
  fn from(args: PartArgs) -> Self {
    SparePartInput {
      motorcycle_id: args.motor,
      name: args.name,
      quantity: args.qty,
      unit_price: args.price,
      current_odometer: args.current_km,
      next_service_odometer: args.next_km,
      date: args.date,
      note: args.note,
    }
  }
}

#[derive(Subcommand)]
enum PartCommand {
  Add(PartArgs),
  Update {
    id: i64,
    #[command(flatten)]
    part: PartArgs,
  },
  Delete { id: i64 },
  List {
    #[arg(long)]
    motor: Option<i64>,
  },
}

#[derive(Subcommand)]
enum FuelCommand {
  Add {
    #[arg(long)]
    motor: Option<i64>,
    #[arg(long)]
    date: String,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    liters: f64,
    #[arg(long)]
    total: f64,
    #[arg(long)]
    location: Option<String>,
  },
  Delete { id: i64 },
  List,
}

#[derive(Subcommand)]
enum KmCommand {
  Add {
    #[arg(long)]
    motor: i64,
    #[arg(long)]
    date: String,
    #[arg(long)]
    km: f64,
  },
  Delete { id: i64 },
  List {
    #[arg(long)]
    motor: Option<i64>,
  },
}

#[derive(Subcommand)]
enum ExportCommand {
  Csv {
    #[arg(long)]
    month: Option<YearMonth>,
    #[arg(long)]
    output: Option<PathBuf>,
  },
  Excel {
    #[arg(long)]
    output: Option<PathBuf>,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
  Full,
  Orders,
  Spareparts,
  Fuel,
  Motorcycles,
}

impl From<KindArg> for ExportKind {
  fn from(kind: KindArg) -> Self {
    match kind {
      KindArg::Full => ExportKind::Full,
      KindArg::Orders => ExportKind::Orders,
      KindArg::Spareparts => ExportKind::Spareparts,
      KindArg::Fuel => ExportKind::Fuel,
      KindArg::Motorcycles => ExportKind::Motorcycles,
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  logging::init(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      if err.is_operational() {
        error!(code = %err.code, "{}", err.message);
        eprintln!("Operasi gagal, silakan coba lagi ({})", err.code);
      } else {
        eprintln!("{}", err.message);
      }
      ExitCode::FAILURE
    }
  }
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn run(cli: Cli) -> Result<(), AppError> {
  let app_dir = match cli.data_dir {
    Some(dir) => dir,
    None => db::resolve_app_dir()?,
  };
  let state = AppState::open(app_dir)?;

  match cli.command {
    Command::Login { id, email } => print_json(&commands::login(&state, User { id, email })?),
    Command::Logout => commands::logout(&state),
    Command::Whoami => print_json(&commands::current_user(&state)?),
    Command::Settings(SettingsCommand::Show) => print_json(&commands::get_settings(&state)?),
    Command::Settings(SettingsCommand::Set { warning_km, currency }) => {
      let current = commands::get_settings(&state)?;
      let next = Settings {
        service_warning_km: warning_km.unwrap_or(current.service_warning_km),
        currency_prefix: currency.unwrap_or(current.currency_prefix),
      };
      print_json(&commands::update_settings(&state, next)?)
    }
    Command::Motor(MotorCommand::Add { name, model, year }) => {
      print_json(&commands::create_motorcycle(&state, MotorcycleInput { name, model, year })?)
    }
    Command::Motor(MotorCommand::List) => print_json(&commands::list_motorcycles(&state)?),
    Command::Motor(MotorCommand::Delete { id }) => {
      let removed = commands::delete_motorcycle(&state, id)?;
      print_json(&serde_json::json!({ "deleted": id, "spareparts_removed": removed }))
    }
    Command::Order(OrderCommand::Add(args)) => print_json(&commands::create_order(&state, args.into())?),
    Command::Order(OrderCommand::Update { id, order }) => {
      print_json(&commands::update_order(&state, id, order.into())?)
    }
    Command::Order(OrderCommand::Delete { id }) => commands::delete_order(&state, id),
    Command::Order(OrderCommand::List { month }) => print_json(&commands::list_open_orders(&state, month)?),
    Command::Order(OrderCommand::Closed { period_id }) => {
      print_json(&commands::list_closed_period_orders(&state, period_id)?)
    }
    Command::Part(PartCommand::Add(args)) => print_json(&commands::create_spare_part(&state, args.into())?),
    Command::Part(PartCommand::Update { id, part }) => {
      print_json(&commands::update_spare_part(&state, id, part.into())?)
    }
    Command::Part(PartCommand::Delete { id }) => commands::delete_spare_part(&state, id),
    Command::Part(PartCommand::List { motor }) => print_json(&commands::list_spare_parts(&state, motor)?),
    Command::Fuel(FuelCommand::Add {
      motor,
      date,
      price,
      liters,
      total,
      location,
    }) => print_json(&commands::create_fuel_stop(
      &state,
      FuelStopInput {
        motorcycle_id: motor,
        date,
        liter_price: price,
        liters,
        total,
        location,
      },
    )?),
    Command::Fuel(FuelCommand::Delete { id }) => commands::delete_fuel_stop(&state, id),
    Command::Fuel(FuelCommand::List) => print_json(&commands::list_fuel_stops(&state)?),
    Command::Km(KmCommand::Add { motor, date, km }) => print_json(&commands::record_odometer(
      &state,
      OdometerInput {
        motorcycle_id: motor,
        date,
        odometer_km: km,
      },
    )?),
    Command::Km(KmCommand::Delete { id }) => commands::delete_odometer(&state, id),
    Command::Km(KmCommand::List { motor }) => print_json(&commands::list_odometer(&state, motor)?),
    Command::Close { month, sub } => print_json(&commands::close_book(&state, month.year, month.month, sub)?),
    Command::Ledger => print_json(&commands::list_closed_periods(&state)?),
    Command::Dashboard { motor, month, period } => print_json(&commands::dashboard(
      &state,
      AggregationRequest {
        motorcycle_id: motor,
        month,
        period,
      },
    )?),
    Command::Report { month, period, amounts } => {
      println!("{}", commands::text_report(&state, month, period, amounts)?);
      Ok(())
    }
    Command::Reminders { motor } => print_json(&commands::service_reminders(&state, motor)?),
    Command::Export(ExportCommand::Csv { month, output }) => {
      let path = commands::export_orders_csv(&state, month, output)?;
      println!("{}", path.display());
      Ok(())
    }
    Command::Export(ExportCommand::Excel { output }) => {
      let path = commands::export_excel(&state, output)?;
      println!("{}", path.display());
      Ok(())
    }
    Command::Backup { kind, output } => {
      let path = commands::create_backup(&state, kind.into(), output)?;
      println!("{}", path.display());
      Ok(())
    }
    Command::Restore { path, best_effort } => {
      let mode = if best_effort {
        RestoreMode::BestEffort
      } else {
        RestoreMode::Atomic
      };
      print_json(&commands::restore_backup(&state, &path, mode)?)
    }
    Command::Audit { page, page_size } => print_json(&commands::list_audit_log(&state, page, page_size)?),
  }
}
