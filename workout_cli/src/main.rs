use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;
use workout_core::outbox;
use workout_core::timers::TimerEvent;
use workout_core::*;

#[derive(Parser)]
#[command(name = "coachrun")]
#[command(about = "Live workout runner for coached training sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scheduled session or an appointment workout
    Run {
        /// Signed-in client id
        #[arg(long)]
        client: Uuid,

        /// Scheduled session to run
        #[arg(long, conflicts_with = "appointment", required_unless_present = "appointment")]
        scheduled: Option<Uuid>,

        /// Appointment to run
        #[arg(long)]
        appointment: Option<Uuid>,

        /// Use a local JSON snapshot instead of the hosted platform
        #[arg(long)]
        offline: Option<PathBuf>,

        /// Auto-complete (for testing) - complete every set, skip every rest
        #[arg(long)]
        auto_complete: bool,

        /// Append completed sets to this CSV file when the workout ends
        #[arg(long)]
        export: Option<PathBuf>,

        /// Override the current time (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Replay writes that failed to reach the platform
    Flush {
        /// Use a local JSON snapshot instead of the hosted platform
        #[arg(long)]
        offline: Option<PathBuf>,
    },
}

struct RunOptions {
    target: WorkoutTarget,
    client: ClientContext,
    auto_complete: bool,
    export: Option<PathBuf>,
    now: DateTime<Utc>,
}

fn main() -> Result<()> {
    workout_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    match cli.command {
        Commands::Run {
            client,
            scheduled,
            appointment,
            offline,
            auto_complete,
            export,
            now,
        } => {
            let target = match (scheduled, appointment) {
                (Some(id), _) => WorkoutTarget::Scheduled(id),
                (None, Some(id)) => WorkoutTarget::Appointment(id),
                (None, None) => {
                    return Err(Error::Config(
                        "either --scheduled or --appointment is required".into(),
                    ))
                }
            };
            let options = RunOptions {
                target,
                client: ClientContext { client_id: client },
                auto_complete,
                export,
                now: now.unwrap_or_else(Utc::now),
            };
            cmd_run(offline.as_deref(), options, &config)
        }
        Commands::Flush { offline } => cmd_flush(offline.as_deref(), &config),
    }
}

fn cmd_run(offline: Option<&Path>, options: RunOptions, config: &Config) -> Result<()> {
    match offline {
        Some(snapshot_path) => {
            let platform = MemoryPlatform::open(snapshot_path)?;
            run_workout(&platform, options, config)?;
            platform.save(snapshot_path)
        }
        None => {
            let platform = RestPlatform::from_config(&config.platform)?;
            run_workout(&platform, options, config)
        }
    }
}

fn cmd_flush(offline: Option<&Path>, config: &Config) -> Result<()> {
    let outbox_path = config.data.outbox_path();
    if !outbox_path.exists() {
        println!("Outbox is empty - nothing to flush.");
        return Ok(());
    }

    let report = match offline {
        Some(snapshot_path) => {
            let platform = MemoryPlatform::open(snapshot_path)?;
            let report = outbox::replay(&outbox_path, &platform)?;
            platform.save(snapshot_path)?;
            report
        }
        None => {
            let platform = RestPlatform::from_config(&config.platform)?;
            outbox::replay(&outbox_path, &platform)?
        }
    };

    println!("✓ Flushed {} queued writes", report.applied);
    if report.remaining > 0 {
        println!("  {} writes still failing, kept for next time", report.remaining);
    }
    Ok(())
}

fn run_workout<P: DataPlatform>(platform: &P, options: RunOptions, config: &Config) -> Result<()> {
    tracing::info!(
        "Starting {} for client {}",
        options.target,
        options.client.client_id
    );
    let prepared = prepare(
        platform,
        &options.client,
        options.target,
        options.now,
        &config.runner,
    )?;

    let (session, progress) = match prepared {
        Prepared::Ready { session, progress } => (session, progress),
        Prepared::TooEarly { starts_at, title } => {
            println!(
                "\n{} starts at {}. Come back later: the workout opens {} minutes before the start.",
                title,
                starts_at.format("%Y-%m-%d %H:%M UTC"),
                config.runner.early_access_minutes
            );
            return Ok(());
        }
    };

    let sync = DirectSync::new(platform).with_outbox(Outbox::new(config.data.outbox_path()));
    let mut runner = WorkoutRunner::new(options.client, session, progress, sync, &config.runner);
    display_header(&runner);

    let finished = if options.auto_complete {
        auto_run(&mut runner, options.now)?;
        true
    } else {
        interactive_run(&mut runner)?
    };

    if !finished {
        println!("\nLeft the workout. Completed sets are saved.");
        return Ok(());
    }

    let finished_at = if options.auto_complete {
        virtual_time(&runner, options.now)
    } else {
        Utc::now()
    };
    runner.finish(finished_at);

    let summary = WorkoutSummary::from_runner(&runner);
    display_summary(&summary);

    if let Some(csv_path) = options.export {
        let count = summary.append_csv(&csv_path)?;
        println!("  Exported {} sets to {}", count, csv_path.display());
    }

    let failures = runner.sync().failures();
    if failures > 0 {
        println!(
            "\n{} writes could not be saved and were queued. Run `coachrun flush` to retry.",
            failures
        );
    }
    Ok(())
}

/// Wall time in auto mode: the start time plus elapsed virtual seconds
fn virtual_time<S: LogSync>(runner: &WorkoutRunner<S>, start: DateTime<Utc>) -> DateTime<Utc> {
    start + Duration::seconds(runner.elapsed_seconds() as i64)
}

fn auto_run<S: LogSync>(runner: &mut WorkoutRunner<S>, start: DateTime<Utc>) -> Result<()> {
    loop {
        match runner.state() {
            SequencerState::Completed => return Ok(()),
            SequencerState::Resting { .. } => {
                runner.skip_rest();
            }
            SequencerState::AtSet { step, set } => {
                let current = runner.steps()[step].clone();

                // AMRAP has no natural end; stop after the prescribed sets
                if current.group_kind() == Some(GroupKind::Amrap) && set >= current.sets as usize {
                    runner.exit_group()?;
                    continue;
                }

                display_set(runner);
                if current.prescription.tracking_mode() == TrackingMode::Duration {
                    runner.start_work_timer()?;
                    while runner.work_timer().map_or(false, |t| !t.is_finished()) {
                        report_events(&runner.tick());
                    }
                }

                let at = virtual_time(runner, start);
                runner.complete_current_set(at)?;
            }
        }
    }
}

/// Returns true when the workout ran to completion, false when the user quit
fn interactive_run<S: LogSync>(runner: &mut WorkoutRunner<S>) -> Result<bool> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut last_tick = Instant::now();

    loop {
        let seconds = last_tick.elapsed().as_secs() as u32;
        if seconds > 0 {
            report_events(&runner.advance_by(seconds));
            last_tick += std::time::Duration::from_secs(seconds as u64);
        }

        if runner.state() == SequencerState::Completed {
            return Ok(true);
        }

        display_state(runner);
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(false);
        };
        let line = line?;

        let seconds = last_tick.elapsed().as_secs() as u32;
        if seconds > 0 {
            report_events(&runner.advance_by(seconds));
            last_tick += std::time::Duration::from_secs(seconds as u64);
        }

        match handle_command(runner, line.trim()) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Wait) => {
                wait_in_real_time(runner);
                last_tick = Instant::now();
            }
            Ok(Flow::Quit) => return Ok(false),
            Err(Error::InvalidAction(msg)) => println!("  ! {}", msg),
            Err(e) => return Err(e),
        }
    }
}

enum Flow {
    Continue,
    Wait,
    Quit,
}

fn handle_command<S: LogSync>(runner: &mut WorkoutRunner<S>, input: &str) -> Result<Flow> {
    let mut parts = input.split_whitespace();
    let command = parts.next().unwrap_or("").to_lowercase();
    let argument = parts.next();

    let number = || -> Result<f64> {
        argument
            .and_then(|a| a.parse::<f64>().ok())
            .ok_or_else(|| Error::InvalidAction(format!("'{}' needs a number", command)))
    };

    match command.as_str() {
        "" | "d" => match runner.state() {
            SequencerState::Resting { .. } => {
                runner.skip_rest();
            }
            _ => {
                runner.complete_current_set(Utc::now())?;
            }
        },
        "s" => {
            runner.skip_rest();
        }
        "w" => {
            let timer_idle = runner.work_timer().map_or(true, |t| t.is_finished());
            if runner.rest().is_none() && timer_idle {
                runner.start_work_timer()?;
            }
            return Ok(Flow::Wait);
        }
        "b" => {
            runner.previous_step()?;
        }
        "g" => {
            let step = number()? as usize;
            runner.go_to_step(step.saturating_sub(1))?;
        }
        "x" => {
            runner.exit_group()?;
        }
        "p" => {
            let paused = runner.toggle_pause();
            println!("  {}", if paused { "Paused" } else { "Resumed" });
        }
        "r" => runner.update_current_field(SetField::Reps, number()?)?,
        "kg" => runner.update_current_field(SetField::Weight, number()?)?,
        "t" => runner.update_current_field(SetField::DurationSeconds, number()?)?,
        "m" => runner.update_current_field(SetField::DistanceMeters, number()?)?,
        "q" => return Ok(Flow::Quit),
        other => {
            return Err(Error::InvalidAction(format!("unknown command '{}'", other)));
        }
    }
    Ok(Flow::Continue)
}

/// Tick once per second until the rest or work timer on screen is over
fn wait_in_real_time<S: LogSync>(runner: &mut WorkoutRunner<S>) {
    while is_waiting(runner) {
        std::thread::sleep(std::time::Duration::from_secs(1));
        report_events(&runner.tick());

        if let Some(rest) = runner.rest() {
            print!("\r  Rest {:>3}s ", rest.remaining);
        } else if let Some(timer) = runner.work_timer() {
            match timer.countdown {
                Some(left) => print!("\r  Starting in {}... ", left),
                None => print!("\r  Work {:>3}s ", timer.remaining),
            }
        }
        let _ = io::stdout().flush();
    }
    println!();
}

fn is_waiting<S: LogSync>(runner: &WorkoutRunner<S>) -> bool {
    runner.rest().is_some()
        || runner
            .work_timer()
            .map_or(false, |t| t.running || t.countdown.is_some())
}

fn report_events(events: &[TimerEvent]) {
    for event in events {
        let buzz = if event.vibrates() { " (buzz)" } else { "" };
        match event {
            TimerEvent::RestExpired => println!("\n  ⏱ Rest over"),
            TimerEvent::CountdownElapsed { set_index } => {
                println!("\n  ▶ Go! set {}{}", set_index + 1, buzz)
            }
            TimerEvent::WorkElapsed { set_index } => {
                println!("\n  ■ Set {} time is up{}", set_index + 1, buzz)
            }
        }
    }
}

fn display_header<S: LogSync>(runner: &WorkoutRunner<S>) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", runner.meta().name);
    println!("╰─────────────────────────────────────────╯");
    if let Some(ref notes) = runner.meta().notes {
        println!("  {}", notes);
    }
    println!("  {} steps", runner.steps().len());
    println!();
}

fn display_state<S: LogSync>(runner: &WorkoutRunner<S>) {
    match runner.state() {
        SequencerState::Resting { seconds_remaining } => {
            println!("\n  Resting: {}s left", seconds_remaining);
            println!("─────────────────────────────────────────");
            println!("Enter/'s' skip rest, 'w' wait it out, 'b' back, 'q' quit");
        }
        SequencerState::AtSet { .. } => {
            display_set(runner);
            println!("─────────────────────────────────────────");
            println!("Enter complete set, 'r|kg|t|m <n>' edit, 'w' run timer,");
            println!("'b' back, 'g <n>' go to step, 'x' exit group, 'p' pause, 'q' quit");
        }
        SequencerState::Completed => {}
    }
}

fn display_set<S: LogSync>(runner: &WorkoutRunner<S>) {
    let (Some(step), Some((step_index, set_index))) = (runner.current_step(), runner.position())
    else {
        return;
    };

    println!();
    if let Some(ref group) = step.group {
        println!("  [{:?}] {}", group.kind, group.name);
    }
    let of_sets = match step.group_kind() {
        Some(GroupKind::Amrap) => String::new(),
        Some(_) => format!(" of {}", step.target_rounds()),
        None => format!(" of {}", step.sets),
    };
    println!(
        "  Step {}/{}: {} - set {}{}",
        step_index + 1,
        runner.steps().len(),
        step.name,
        set_index + 1,
        of_sets
    );

    if let Some(record) = runner.current_set() {
        let ghost = if record.is_ghost { " (last time)" } else { "" };
        let done = if record.completed { " ✓" } else { "" };
        println!("  → {}{}{}", format_values(&record.values), ghost, done);
    }

    let elapsed = runner.elapsed_seconds();
    let paused = if runner.is_paused() { " (paused)" } else { "" };
    println!("  Elapsed {:02}:{:02}{}", elapsed / 60, elapsed % 60, paused);
}

fn format_values(values: &SetValues) -> String {
    match values {
        SetValues::Standard { reps, weight } if *weight > 0.0 => format!("{} reps @ {} kg", reps, weight),
        SetValues::Standard { reps, .. } => format!("{} reps", reps),
        SetValues::Timed { duration_seconds } => format!("{} s", duration_seconds),
        SetValues::Distance { meters } => format!("{} m", meters),
    }
}

fn display_summary(summary: &WorkoutSummary) {
    println!("\n✓ Workout complete!");
    println!("  {}", summary.name);
    println!(
        "  Time: {:02}:{:02}",
        summary.elapsed_seconds / 60,
        summary.elapsed_seconds % 60
    );
    println!("  Sets completed: {}", summary.completed_sets());
    let volume = summary.total_volume();
    if volume > 0.0 {
        println!("  Volume: {:.0} kg", volume);
    }
}
