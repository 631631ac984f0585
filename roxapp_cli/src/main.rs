use clap::{Parser, Subcommand};
use roxapp_core::config::CueBackend;
use roxapp_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rox")]
#[command(about = "Hyrox and CrossFit workout timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override plans directory
    #[arg(long, global = true)]
    plans_dir: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a workout (the built-in sample when no plan is given)
    Play {
        /// Plan file, or plan name inside the plans directory
        plan: Option<String>,

        /// Run on a virtual clock with a scripted athlete instead of live
        #[arg(long)]
        simulate: bool,

        /// Simulation: seconds per AMRAP round
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
        round_secs: u32,

        /// Simulation: seconds before manually paced sections are completed
        #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u32).range(1..))]
        manual_secs: u32,

        /// Frame interval in milliseconds (defaults to config, 250 when simulating)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        frame_ms: Option<u64>,
    },

    /// Print the sections and exercises of a workout
    Show {
        plan: Option<String>,
    },

    /// Check a plan for problems
    Validate {
        plan: String,
    },

    /// Print the built-in sample workout as JSON
    Sample,
}

fn main() -> Result<()> {
    // Initialize logging
    roxapp_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let plans_dir = cli
        .plans_dir
        .clone()
        .unwrap_or_else(|| config.data.plans_dir.clone());

    match cli.command {
        Commands::Play {
            plan,
            simulate,
            round_secs,
            manual_secs,
            frame_ms,
        } => {
            let workout = load_plan(plan.as_deref(), &plans_dir)?;
            if simulate {
                cmd_simulate(workout, &config, round_secs, manual_secs, frame_ms.unwrap_or(250))
            } else {
                let frame = frame_ms.map_or_else(|| config.clock.frame_interval(), Duration::from_millis);
                cmd_play(workout, &config, frame)
            }
        }
        Commands::Show { plan } => cmd_show(&load_plan(plan.as_deref(), &plans_dir)?),
        Commands::Validate { plan } => cmd_validate(&plan, &plans_dir),
        Commands::Sample => {
            println!("{}", serde_json::to_string_pretty(get_sample_workout())?);
            Ok(())
        }
    }
}

fn load_plan(plan: Option<&str>, plans_dir: &std::path::Path) -> Result<WorkoutStructure> {
    match plan {
        Some(name) => load_workout(&resolve_plan_path(name, plans_dir)?),
        None => Ok(get_sample_workout().clone()),
    }
}

fn build_cues(config: &Config) -> Box<dyn CueEmitter> {
    if !config.cues.enabled {
        return Box::new(SilentCues);
    }
    match config.cues.backend {
        CueBackend::Silent => Box::new(SilentCues),
        CueBackend::Bell => Box::new(TerminalBell::new()),
        #[cfg(feature = "audio")]
        CueBackend::Tone => Box::new(roxapp_core::cue::ToneCues::new(config.cues.volume)),
        #[cfg(not(feature = "audio"))]
        CueBackend::Tone => {
            tracing::warn!("Tone cues need the 'audio' feature, falling back to the terminal bell");
            Box::new(TerminalBell::new())
        }
    }
}

// ============================================================================
// show / validate
// ============================================================================

fn cmd_show(workout: &WorkoutStructure) -> Result<()> {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", workout.title);
    println!("╰─────────────────────────────────────────╯");
    if let Some(date) = workout.date {
        println!("  {}", date);
    }
    println!();

    let total = workout.sections.len();
    for (idx, section) in workout.sections.iter().enumerate() {
        // An idle engine gives the numbers a player would show before start
        let idle = TimerEngine::new(section.clone(), VirtualClock::default(), SilentCues);
        let view = SectionView::render(section, &idle.snapshot());

        let title = section.title.as_deref().unwrap_or(&workout.title);
        println!("── Part {}/{}: {} ({})", idx + 1, total, title, section.kind);
        print!("{}", view);
        if let Some((_, label)) = view.primary_action() {
            println!("  [{}]", label);
        }
        println!();
    }
    Ok(())
}

fn cmd_validate(plan: &str, plans_dir: &std::path::Path) -> Result<()> {
    let path = resolve_plan_path(plan, plans_dir)?;
    let workout = load_workout(&path)?;
    let errors = workout.validate();
    if !errors.is_empty() {
        eprintln!("Plan validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Plan(format!(
            "{} problem(s) in {}",
            errors.len(),
            path.display()
        )));
    }

    println!(
        "✓ Plan '{}' is valid ({} sections)",
        workout.title,
        workout.sections.len()
    );
    Ok(())
}

// ============================================================================
// simulate
// ============================================================================

fn cmd_simulate(
    workout: WorkoutStructure,
    config: &Config,
    round_secs: u32,
    manual_secs: u32,
    frame_ms: u64,
) -> Result<()> {
    let cues = CueLog::new();
    let mut player = WorkoutPlayer::with_profile(
        workout,
        VirtualClock::new(frame_ms),
        cues.clone(),
        NoWakeLock,
        config.cues.profile.clone(),
    )?;

    println!("Simulating '{}'", player.workout().title);
    let mut current = None;
    // Rounds the athlete has already reported in the current section
    let mut rounds_logged = 0;

    while !player.is_finished() {
        if current != Some(player.section_index()) {
            current = Some(player.section_index());
            rounds_logged = 0;
            println!("\n{}", player.header());
            let events = player.dispatch(PlayerAction::Start);
            report(&cues, &events, 0);
        }

        let second = player.snapshot().elapsed_time + 1;
        let events = player.run_for(1000);
        report(&cues, &events, second);
        if player.is_finished() || current != Some(player.section_index()) {
            continue;
        }

        let snap = player.snapshot();
        let section = player.section();
        let manual = !section.kind.auto_completes() || section.duration.is_none();
        // Round boundaries are crossed, not hit, since elapsed can skip a second
        let rounds_due = snap.elapsed_time / round_secs;
        let action = if manual && snap.elapsed_time >= manual_secs {
            Some(PlayerAction::Complete)
        } else if section.kind == SectionType::Amrap && rounds_due > rounds_logged {
            rounds_logged = rounds_due;
            Some(PlayerAction::NextRound)
        } else {
            None
        };

        if let Some(action) = action {
            let events = player.dispatch(action);
            report(&cues, &events, snap.elapsed_time);
            if action == PlayerAction::NextRound {
                println!("  [{}] round {}", format_time(snap.elapsed_time), player.snapshot().current_round);
            }
        }
    }

    print_summary(player.summaries());
    Ok(())
}

fn report(cues: &CueLog, events: &[PlayerEvent], second: u32) {
    for cue in cues.take_new() {
        let label = match cue {
            Cue::Start => "go".to_string(),
            Cue::Countdown(n) => format!("{}...", n),
            Cue::Transition => "next interval".to_string(),
            Cue::NextExercise => "next exercise".to_string(),
            Cue::NextRound => "round done".to_string(),
            Cue::Complete => "time".to_string(),
        };
        println!("  [{}] beep: {}", format_time(second), label);
    }
    for event in events {
        print_event(event);
    }
}

// ============================================================================
// live play
// ============================================================================

enum Command {
    Player(PlayerAction),
    SkipSection,
    Help,
    Quit,
}

/// Map one line of input to a command given the current state
fn parse_command(line: &str, state: TimerState, view: &SectionView) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "" | "s" => Some(Command::Player(match state {
            TimerState::Idle => PlayerAction::Start,
            TimerState::Running => PlayerAction::Pause,
            TimerState::Paused => PlayerAction::Resume,
            TimerState::Completed => return None,
        })),
        "p" => Some(Command::Player(PlayerAction::Pause)),
        "r" => Some(Command::Player(PlayerAction::Reset)),
        "e" => Some(Command::Player(PlayerAction::NextExercise)),
        "n" => view.primary_action().map(|(action, _)| Command::Player(action)),
        "c" => Some(Command::Player(PlayerAction::Complete)),
        "k" => Some(Command::SkipSection),
        "h" | "?" => Some(Command::Help),
        "q" => Some(Command::Quit),
        _ => None,
    }
}

fn print_help(view: &SectionView) {
    println!("─────────────────────────────────────────");
    println!("Enter      start / pause / resume");
    if let Some((_, label)) = view.primary_action() {
        println!("  'n'      {}", label.to_lowercase());
    }
    println!("  'e'      next exercise");
    println!("  'r'      reset section");
    println!("  'k'      skip to next section");
    println!("  'q'      quit");
}

fn spawn_input_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn cmd_play(workout: WorkoutStructure, config: &Config, frame: Duration) -> Result<()> {
    let mut player = WorkoutPlayer::with_profile(
        workout,
        SystemClock::new(frame),
        build_cues(config),
        NoWakeLock,
        config.cues.profile.clone(),
    )?;
    let input = spawn_input_reader();

    print_section(&player);
    print_help(&player.view());

    let mut last_status = String::new();
    loop {
        let mut lines = Vec::new();
        loop {
            match input.try_recv() {
                Ok(line) => lines.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    lines.push("q".into());
                    break;
                }
            }
        }

        let (ticked, events) = player.pump();
        let mut section_changed = print_events(&events);

        if !ticked && lines.is_empty() {
            // Nothing scheduled: wait for the athlete instead of spinning
            match input.recv_timeout(Duration::from_millis(200)) {
                Ok(line) => lines.push(line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => lines.push("q".into()),
            }
        }

        for line in lines {
            let view = player.view();
            match parse_command(&line, player.snapshot().state, &view) {
                Some(Command::Player(action)) => {
                    section_changed |= print_events(&player.dispatch(action));
                }
                Some(Command::SkipSection) => {
                    section_changed |= print_events(&player.next_section());
                }
                Some(Command::Help) => print_help(&view),
                Some(Command::Quit) => {
                    println!();
                    print_summary(player.summaries());
                    return Ok(());
                }
                None => {}
            }
        }

        if player.is_finished() {
            break;
        }
        if section_changed {
            print_section(&player);
            last_status.clear();
        }

        let status = format!("{:<9} {}", player.snapshot().state, player.view().status_line());
        if status != last_status {
            print!("\r\x1b[2K{}", status);
            io::stdout().flush()?;
            last_status = status;
        }
    }

    print_summary(player.summaries());
    Ok(())
}

fn print_section<C: ClockSource, E: CueEmitter, W: WakeLock>(player: &WorkoutPlayer<C, E, W>) {
    println!("\n\n{}", player.header());
    print!("{}", player.view());
}

/// Print player events, returning true if a new section was loaded
fn print_events(events: &[PlayerEvent]) -> bool {
    events.iter().fold(false, |changed, event| {
        print_event(event);
        changed || matches!(event, PlayerEvent::SectionLoaded { .. })
    })
}

fn print_event(event: &PlayerEvent) {
    match event {
        PlayerEvent::SectionCompleted(summary) => {
            println!(
                "\n✓ Part {} done: {} in {}",
                summary.index + 1,
                summary.kind,
                format_time(summary.elapsed_time)
            );
        }
        PlayerEvent::WorkoutCompleted => println!("\n✓ Workout complete!"),
        PlayerEvent::StateChanged { state, .. } => tracing::debug!("state -> {}", state),
        PlayerEvent::SectionLoaded { index } => tracing::debug!("section {} loaded", index + 1),
    }
}

fn print_summary(summaries: &[SectionSummary]) {
    if summaries.is_empty() {
        return;
    }
    println!("\nSummary");
    for s in summaries {
        let rounds = if s.kind == SectionType::Amrap {
            format!("  {} round(s)", s.rounds.saturating_sub(1))
        } else {
            String::new()
        };
        println!(
            "  {}. {:<16} {:<9} {}{}",
            s.index + 1,
            s.section_id,
            s.kind,
            format_time(s.elapsed_time),
            rounds
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amrap_view() -> SectionView {
        let section = WorkoutSection::new("a", SectionType::Amrap).with_duration(300);
        SectionView::render(&section, &TimerSnapshot::default())
    }

    #[test]
    fn test_enter_toggles_run_state() {
        let view = amrap_view();
        let action = |state| match parse_command("", state, &view) {
            Some(Command::Player(a)) => Some(a),
            _ => None,
        };
        assert_eq!(action(TimerState::Idle), Some(PlayerAction::Start));
        assert_eq!(action(TimerState::Running), Some(PlayerAction::Pause));
        assert_eq!(action(TimerState::Paused), Some(PlayerAction::Resume));
        assert_eq!(action(TimerState::Completed), None);
    }

    #[test]
    fn test_primary_action_key() {
        let view = amrap_view();
        assert!(matches!(
            parse_command("n", TimerState::Running, &view),
            Some(Command::Player(PlayerAction::NextRound))
        ));
        assert!(matches!(
            parse_command(" Q ", TimerState::Running, &view),
            Some(Command::Quit)
        ));
        assert!(parse_command("xyz", TimerState::Running, &view).is_none());
    }
}
