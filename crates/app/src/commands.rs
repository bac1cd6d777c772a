//! Command-line front end

use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveTime, Weekday};
use clap::{Args, Parser, Subcommand};
use salon_core::auth::{authenticate_staff, hash_pin};
use salon_core::schedule::{parse_time, parse_weekday, RawSchedule, RawWeekday, WEEK};
use salon_core::{
    normalize, normalize_json, Actor, Appointment, AppointmentFilter, AppointmentStatus,
    BookingError, BookingRequest, DashboardStats, Durability, LocalStore, PaymentMethod, Service,
    Staff, WeeklySchedule,
};
use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::service::BookingService;
use crate::state::AppState;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] salon_core::Error),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Input(String),
}

/// Salon - appointments for a barbershop or salon
#[derive(Parser, Debug)]
#[command(name = "salon", version, about, long_about = None)]
pub struct Cli {
    /// Path to salon.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage staff members
    Staff {
        #[command(subcommand)]
        action: StaffCommand,
    },
    /// Manage the service catalog
    Service {
        #[command(subcommand)]
        action: ServiceCommand,
    },
    /// Show a staff member's slots for a date
    Slots {
        #[arg(long)]
        staff: Uuid,
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        /// Drop slots this service would not fit in
        #[arg(long)]
        service: Option<Uuid>,
    },
    /// Book an appointment
    Book {
        #[arg(long)]
        service: Uuid,
        #[arg(long)]
        staff: Uuid,
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time_arg)]
        time: NaiveTime,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        /// cash or online
        #[arg(long, default_value = "cash", value_parser = parse_payment_arg)]
        payment: PaymentMethod,
    },
    /// Cancel an appointment, freeing its slot
    Cancel(StatusArgs),
    /// Mark an appointment as attended
    Attend(StatusArgs),
    /// Restore a cancelled appointment if its slot is still free
    Reactivate(StatusArgs),
    /// List appointments
    Appointments {
        #[arg(long)]
        staff: Option<Uuid>,
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_status_arg)]
        status: Option<AppointmentStatus>,
    },
    /// Dashboard figures
    Stats {
        /// Reference date (defaults to today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Copy the database into the local-only snapshot
    LocalSnapshot,
}

#[derive(Subcommand, Debug)]
pub enum StaffCommand {
    Add {
        name: String,
        #[arg(long, default_value = "Staff")]
        role: String,
        #[arg(long)]
        image: Option<String>,
    },
    List,
    /// Replace the weekly schedule
    Schedule {
        id: Uuid,
        /// Raw schedule JSON, per-day or window form
        #[arg(long, conflicts_with_all = ["start", "end", "days"])]
        json: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Working days, e.g. mon,tue,wed
        #[arg(long, value_delimiter = ',')]
        days: Vec<String>,
    },
    /// Set the staff PIN, or clear it when omitted
    SetPin {
        id: Uuid,
        #[arg(long)]
        pin: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    Add {
        title: String,
        #[arg(long)]
        price: i64,
        #[arg(long, default_value_t = 30)]
        duration: u32,
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    List,
    SetPrice {
        id: Uuid,
        price: i64,
    },
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub id: Uuid,
    /// Act as this staff member instead of the owner
    #[arg(long, requires = "pin")]
    pub staff: Option<Uuid>,
    #[arg(long)]
    pub pin: Option<String>,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_time_arg(value: &str) -> Result<NaiveTime, String> {
    parse_time(value).ok_or_else(|| "expected HH:MM".to_string())
}

fn parse_payment_arg(value: &str) -> Result<PaymentMethod, String> {
    PaymentMethod::parse(value).ok_or_else(|| "expected cash or online".to_string())
}

fn parse_status_arg(value: &str) -> Result<AppointmentStatus, String> {
    AppointmentStatus::parse(value).ok_or_else(|| "expected confirmed, cancelled or attended".to_string())
}

/// wa.me link that opens a chat with the shop, prefilled with `message`
/// Build a schedule from `--start/--end/--days`, rejecting what `normalize`
/// would silently replace with defaults
fn window_schedule(
    start: String,
    end: String,
    days: Vec<String>,
) -> Result<WeeklySchedule, AppError> {
    let (Some(open), Some(close)) = (parse_time(&start), parse_time(&end)) else {
        return Err(AppError::Input(format!(
            "invalid hours {start}-{end}, expected HH:MM"
        )));
    };
    if open >= close {
        return Err(AppError::Input(format!(
            "start {start} must be before end {end}"
        )));
    }
    if let Some(day) = days.iter().find(|d| parse_weekday(d).is_none()) {
        return Err(AppError::Input(format!("unknown weekday {day}")));
    }

    Ok(normalize(&RawSchedule::Window {
        start,
        end,
        days: days.into_iter().map(RawWeekday::Name).collect(),
    }))
}

pub fn confirmation_link(whatsapp: &str, message: &str) -> String {
    format!("https://wa.me/{whatsapp}?text={}", urlencoding::encode(message))
}

pub async fn run(command: Commands, state: AppState) -> Result<(), AppError> {
    let booking = BookingService::new(
        state.backend.clone(),
        state.config.booking.policy(),
        state.config.booking.store_retries,
        state.config.booking.retry_backoff(),
    );

    match command {
        Commands::Staff { action } => run_staff(action, &state),
        Commands::Service { action } => run_service(action, &state),
        Commands::Slots {
            staff,
            date,
            service,
        } => {
            let slots = booking.available_slots(staff, date, service).await?;
            if slots.is_empty() {
                println!("No slots on {date}");
            }
            for slot in slots {
                let mark = if slot.free { "free" } else { "taken" };
                println!("{}  {mark}", slot.time.format("%H:%M"));
            }
            Ok(())
        }
        Commands::Book {
            service,
            staff,
            date,
            time,
            name,
            phone,
            payment,
        } => {
            let request = BookingRequest {
                service_id: service,
                staff_id: staff,
                date,
                time,
                client_name: name,
                client_phone: phone,
                payment_method: payment,
            };
            let appointment = booking.book(request).await?;
            print_appointment(&appointment);
            if booking.durability() == Durability::Local {
                println!("Saved on this device only. Confirm with the shop before relying on it.");
            }

            let message = appointment.confirmation_message();
            println!("{message}");
            if let Some(number) = &state.config.shop.whatsapp {
                println!("{}", confirmation_link(number, &message));
            }
            Ok(())
        }
        Commands::Cancel(args) => {
            let actor = resolve_actor(&args, &state)?;
            print_appointment(&booking.cancel(actor, args.id).await?);
            Ok(())
        }
        Commands::Attend(args) => {
            let actor = resolve_actor(&args, &state)?;
            print_appointment(&booking.mark_attended(actor, args.id).await?);
            Ok(())
        }
        Commands::Reactivate(args) => {
            let actor = resolve_actor(&args, &state)?;
            print_appointment(&booking.reactivate(actor, args.id).await?);
            Ok(())
        }
        Commands::Appointments {
            staff,
            date,
            status,
        } => {
            let filter = AppointmentFilter {
                staff_id: staff,
                date,
                status,
            };
            let appointments = state
                .backend
                .with_store(|s| s.list_appointments(&filter))?;
            for appointment in &appointments {
                print_appointment(appointment);
            }
            Ok(())
        }
        Commands::Stats { date } => {
            let now = Local::now().naive_local();
            let now = date.map_or(now, |d| d.and_time(now.time()));
            let (staff, appointments) = state.backend.with_store(|s| {
                Ok((
                    s.list_staff()?,
                    s.list_appointments(&AppointmentFilter::default())?,
                ))
            })?;
            print_stats(&DashboardStats::compute(&appointments, &staff, now));
            Ok(())
        }
        Commands::LocalSnapshot => {
            let db = state.open_database()?;
            let path = state.local_snapshot_path();
            let local = LocalStore::snapshot_from(&db, &path)?;
            println!(
                "Wrote {} appointments to {}",
                local.snapshot().appointments.len(),
                path.display()
            );
            Ok(())
        }
    }
}

fn run_staff(action: StaffCommand, state: &AppState) -> Result<(), AppError> {
    match action {
        StaffCommand::Add { name, role, image } => {
            let mut staff = Staff::new(name, role);
            if let Some(image) = image {
                staff = staff.with_image(image);
            }
            state.backend.with_store(|s| s.create_staff(&staff))?;
            println!("{}  {}", staff.id, staff.name);
        }
        StaffCommand::List => {
            for staff in state.backend.with_store(|s| s.list_staff())? {
                println!("{}  {} ({})", staff.id, staff.name, staff.role);
                print_schedule(&staff);
            }
        }
        StaffCommand::Schedule {
            id,
            json,
            start,
            end,
            days,
        } => {
            let schedule = match json {
                Some(raw) => {
                    let value: serde_json::Value = serde_json::from_str(&raw)
                        .map_err(|e| AppError::Input(format!("schedule JSON: {e}")))?;
                    normalize_json(Some(&value))
                }
                None => {
                    let (Some(start), Some(end)) = (start, end) else {
                        return Err(AppError::Input(
                            "give --json or both --start and --end".to_string(),
                        ));
                    };
                    window_schedule(start, end, days)?
                }
            };
            state
                .backend
                .with_store(|s| s.update_schedule(id, &schedule))?;
            println!("Schedule updated");
        }
        StaffCommand::SetPin { id, pin } => {
            let hash = pin.as_deref().map(hash_pin).transpose()?;
            state
                .backend
                .with_store(|s| s.set_pin_hash(id, hash.as_deref()))?;
            println!("{}", if hash.is_some() { "PIN set" } else { "PIN cleared" });
        }
    }
    Ok(())
}

fn run_service(action: ServiceCommand, state: &AppState) -> Result<(), AppError> {
    match action {
        ServiceCommand::Add {
            title,
            price,
            duration,
            categories,
            description,
        } => {
            let service = Service::new(title, price, duration)
                .with_categories(categories)
                .with_description(description);
            state.backend.with_store(|s| s.create_service(&service))?;
            println!("{}  {}", service.id, service.title);
        }
        ServiceCommand::List => {
            for service in state.backend.with_store(|s| s.list_services())? {
                println!(
                    "{}  {}  ${}  {} min",
                    service.id,
                    service.title,
                    service.price,
                    service.effective_duration()
                );
            }
        }
        ServiceCommand::SetPrice { id, price } => {
            state.backend.with_store(|s| s.update_price(id, price))?;
            println!("Price updated");
        }
    }
    Ok(())
}

fn resolve_actor(args: &StatusArgs, state: &AppState) -> Result<Actor, AppError> {
    match (args.staff, args.pin.as_deref()) {
        (None, _) => Ok(Actor::Owner),
        (Some(staff_id), Some(pin)) => {
            let staff = state
                .backend
                .with_store(|s| authenticate_staff(s, staff_id, pin))?;
            Ok(Actor::Staff(staff.id))
        }
        (Some(_), None) => Err(AppError::Input("--staff needs --pin".to_string())),
    }
}

fn print_appointment(appointment: &Appointment) {
    println!(
        "{}  {} {}  {:<9}  {} with {}  {} ({})  ${}",
        appointment.id,
        appointment.date,
        appointment.time.format("%H:%M"),
        appointment.status,
        appointment.service_title,
        appointment.staff_name,
        appointment.client_name,
        appointment.client_phone,
        appointment.price
    );
}

fn print_schedule(staff: &Staff) {
    for weekday in WEEK {
        let day = staff.schedule.day(weekday);
        if day.enabled {
            println!(
                "    {}  {} - {}",
                weekday_label(weekday),
                day.start.format("%H:%M"),
                day.end.format("%H:%M")
            );
        } else {
            println!("    {}  off", weekday_label(weekday));
        }
    }
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Sun",
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
    }
}

fn print_stats(stats: &DashboardStats) {
    println!("Today:  {} appointments, ${}", stats.today.appointments, stats.today.revenue);
    println!("Week:   {} appointments, ${}", stats.week.appointments, stats.week.revenue);
    println!("Month:  {} appointments, ${}", stats.month.appointments, stats.month.revenue);
    println!("Total:  {} appointments, ${}", stats.total.appointments, stats.total.revenue);

    println!("Staff:");
    for staff in &stats.staff {
        println!(
            "    {}  {} appointments ({} today), ${}",
            staff.name, staff.appointments, staff.today, staff.revenue
        );
    }
    println!("Top services:");
    for service in &stats.top_services {
        println!("    {}  {}", service.title, service.count);
    }
    println!("Busy hours:");
    for (hour, count) in &stats.busy_hours {
        println!("    {hour:02}:00  {count}");
    }
    if let Some(next) = &stats.next_appointment {
        print!("Next: ");
        print_appointment(next);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_book_command() {
        let cli = Cli::try_parse_from([
            "salon",
            "book",
            "--service",
            "6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "--staff",
            "7f9619ff-8b86-d011-b42d-00c04fc964ff",
            "--date",
            "2030-01-07",
            "--time",
            "09:30",
            "--name",
            "Ana",
            "--phone",
            "555",
            "--payment",
            "mp",
        ])
        .unwrap();

        match cli.command {
            Commands::Book { time, payment, .. } => {
                assert_eq!(time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
                assert_eq!(payment, PaymentMethod::Online);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn staff_flag_requires_pin() {
        let result = Cli::try_parse_from([
            "salon",
            "cancel",
            "6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "--staff",
            "7f9619ff-8b86-d011-b42d-00c04fc964ff",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn confirmation_link_is_encoded() {
        let link = confirmation_link("5493870000000", "Hi! I'm Ana & co.");
        assert_eq!(
            link,
            "https://wa.me/5493870000000?text=Hi%21%20I%27m%20Ana%20%26%20co."
        );
    }

    #[test]
    fn explicit_schedule_hours_are_checked() {
        let days = vec!["mon".to_string(), "tue".to_string()];

        assert!(matches!(
            window_schedule("18:00".into(), "09:00".into(), days.clone()),
            Err(AppError::Input(_))
        ));
        assert!(matches!(
            window_schedule("9am".into(), "18:00".into(), days.clone()),
            Err(AppError::Input(_))
        ));
        assert!(matches!(
            window_schedule("09:00".into(), "18:00".into(), vec!["funday".into()]),
            Err(AppError::Input(_))
        ));

        let schedule = window_schedule("10:00".into(), "16:00".into(), days).unwrap();
        let monday = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        assert_eq!(
            schedule.working_window(monday),
            Some((
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(16, 0, 0).unwrap()
            ))
        );
        assert!(!schedule.is_working_day(monday + chrono::Duration::days(2)));
    }
}
