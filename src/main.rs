use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing_subscriber::EnvFilter;

use loan_offer::{app::App, ui, Clock, OfferSession, OfferTerms, SystemClock};

#[derive(Parser)]
#[command(name = "loan-offer")]
#[command(about = "Pick an amount and tenure for a pre-approved loan offer")]
struct Cli {
    /// TOML file overriding the offer terms
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the offer as JSON and exit instead of opening the screen
    #[arg(long)]
    json: bool,

    /// Initial loan amount (clamped to the offer bounds)
    #[arg(long)]
    amount: Option<f64>,

    /// Initial tenure in months (ignored unless offered)
    #[arg(long)]
    tenure: Option<u32>,

    /// Write logs here; the screen owns stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let terms = match &cli.config {
        Some(path) => OfferTerms::load(path)
            .with_context(|| format!("loading offer terms from {}", path.display()))?,
        None => OfferTerms::default(),
    };

    if cli.json {
        let mut session = OfferSession::start(terms, SystemClock.now());
        apply_initial_selection(&mut session, &cli);
        let snapshot = session.snapshot(SystemClock.now());
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let mut app = App::new(terms, SystemClock);
    apply_initial_selection(&mut app.session, &cli);

    let res = {
        let mut guard = TerminalGuard::enter()?;
        run_app(&mut guard.terminal, &mut app)
    };
    app.session.close();

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // stderr is only safe when the screen is not drawn
        None if cli.json => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("warn"))
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

fn apply_initial_selection(session: &mut OfferSession, cli: &Cli) {
    if let Some(amount) = cli.amount {
        session.set_selected_amount(amount);
    }
    if let Some(months) = cli.tenure {
        session.set_selected_tenure(months);
    }
}

/// Raw mode, alternate screen and focus reporting, undone on drop so every
/// exit path (including a panic) restores the terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            DisableFocusChange,
            LeaveAlternateScreen
        );
        let _ = self.terminal.show_cursor();
    }
}

fn run_app<B: Backend, C: Clock>(terminal: &mut Terminal<B>, app: &mut App<C>) -> Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        // With no refresh scheduled (suspended or expired) block until input.
        let ready = match app.session.next_refresh() {
            Some(interval) => {
                let timeout = interval.saturating_sub(last_tick.elapsed());
                event::poll(timeout)?
            }
            None => true,
        };

        if ready {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key) {
                        return Ok(());
                    }
                }
                Event::FocusGained => {
                    app.on_focus(true);
                    last_tick = Instant::now();
                }
                Event::FocusLost => app.on_focus(false),
                _ => {}
            }
        }

        let due = app
            .session
            .next_refresh()
            .map_or(false, |interval| last_tick.elapsed() >= interval);
        if due {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}
