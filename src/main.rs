use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use crossterm::cursor;
use crossterm::event;
use crossterm::event::Event as CtEvent;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::execute;
use crossterm::queue;
use crossterm::style;
use crossterm::terminal;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use lifegrid::ScreenSize;
use lifegrid::camera::Camera;
use lifegrid::config::Config;
use lifegrid::config::DEFAULT_CELL_SIZE;
use lifegrid::config::DEFAULT_LIVE_PROBABILITY;
use lifegrid::config::DEFAULT_RESOLUTION;
use lifegrid::config::DEFAULT_TICK_RATE;
use lifegrid::config::Resolution;
use lifegrid::engine::Counter;
use lifegrid::engine::Engine;
use lifegrid::topology::Topology;

/// Conway's Game of Life on a fixed size grid, drawn in the terminal.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Width of the drawing surface, in pixels.
    #[arg(long, value_name = "PIXELS", default_value_t = DEFAULT_RESOLUTION.width)]
    width: u32,

    /// Height of the drawing surface, in pixels.
    #[arg(long, value_name = "PIXELS", default_value_t = DEFAULT_RESOLUTION.height)]
    height: u32,

    /// Side length of a single cell, in pixels. The grid has `width / cell-size` columns.
    #[arg(
        long,
        value_name = "PIXELS",
        default_value_t = DEFAULT_CELL_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    cell_size: u32,

    /// Generations per second.
    #[arg(
        long,
        value_name = "TICKS",
        default_value_t = DEFAULT_TICK_RATE,
        value_parser = clap::value_parser!(u32).range(1..=1_000)
    )]
    tick_rate: u32,

    /// Chance of each cell starting out alive.
    #[arg(long, value_name = "P", default_value_t = DEFAULT_LIVE_PROBABILITY)]
    live_probability: f64,

    /// Seed for the initial state. A random seed is picked (and logged) when left out.
    #[arg(long)]
    seed: Option<u64>,

    /// Edge behavior: `toroidal` wraps around, `clipped` freezes the outer ring of cells.
    #[arg(long, default_value_t = Topology::Toroidal)]
    topology: Topology,

    /// Neighbor counting strategy.
    #[arg(long, default_value_t = Counter::Shifted)]
    counter: Counter,

    /// Draw grid lines between cells, when cells are large enough on screen.
    #[arg(long)]
    gridlines: bool,

    /// Run this many generations without a display, then print the final grid.
    #[arg(long, value_name = "N")]
    generations: Option<u64>,

    /// Write logs to this file instead of stderr. Logging to stderr while the grid is on screen
    /// draws over it, so use this together with `RUST_LOG` in the interactive view.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl CliArgs {
    fn config(&self) -> Config {
        Config {
            resolution: Resolution {
                width: self.width,
                height: self.height,
            },
            cell_size: self.cell_size,
            tick_rate: self.tick_rate,
            live_probability: self.live_probability,
            topology: self.topology,
            counter: self.counter,
            seed: self.seed,
        }
    }
}

enum Event {
    TogglePause,
    Step,
    Reseed,
    Resize { cols: u16, rows: u16 },
    Exit,
}

fn handle_event(event: CtEvent) -> Option<Event> {
    match event {
        CtEvent::Key(KeyEvent {
            kind: KeyEventKind::Release,
            ..
        }) => None,
        CtEvent::Key(key_event) => match key_event {
            KeyEvent {
                code: KeyCode::Char('q'),
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => Some(Event::Exit),
            KeyEvent {
                code: KeyCode::Char(' '),
                ..
            } => Some(Event::TogglePause),
            KeyEvent {
                code: KeyCode::Char('n'),
                ..
            } => Some(Event::Step),
            KeyEvent {
                code: KeyCode::Char('r'),
                ..
            } => Some(Event::Reseed),
            _ => None,
        },
        CtEvent::Resize(cols, rows) => Some(Event::Resize { cols, rows }),
        _ => None,
    }
}

/// Measures how many generations actually get computed per second.
struct TickMeter {
    since: Instant,
    ticks: u32,
    rate: f64,
}

impl TickMeter {
    fn new() -> Self {
        Self {
            since: Instant::now(),
            ticks: 0,
            rate: 0.0,
        }
    }

    fn tick(&mut self) {
        self.ticks += 1;

        let elapsed = self.since.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.rate = self.ticks as f64 / elapsed.as_secs_f64();
            self.ticks = 0;
            self.since = Instant::now();
        }
    }
}

/// Everything the interactive view owns besides the engine.
struct Host {
    cam: Camera,
    gridlines: bool,
    paused: bool,
    cropped: bool,
    meter: TickMeter,
}

impl Host {
    fn new(cols: ScreenSize, rows: ScreenSize, gridlines: bool, engine: &Engine) -> Self {
        let mut host = Self {
            // keep the last row for the status line
            cam: Camera::new(cols, rows.saturating_sub(1)),
            gridlines,
            paused: false,
            cropped: false,
            meter: TickMeter::new(),
        };
        host.check_fit(engine);

        host
    }

    fn resize(&mut self, cols: ScreenSize, rows: ScreenSize, engine: &Engine) {
        self.cam.resize(cols, rows.saturating_sub(1));
        self.check_fit(engine);
    }

    // Shown on the status line; a log line would land on top of the grid.
    fn check_fit(&mut self, engine: &Engine) {
        let grid = engine.grid();
        self.cropped = !self.cam.fits(grid.width(), grid.height());
    }

    fn draw(&mut self, engine: &Engine, stdout: &mut io::Stdout) -> io::Result<()> {
        let grid = engine.grid();
        let scale = self.cam.fit(grid.width(), grid.height());

        self.cam.reset();
        self.cam.draw_grid(grid, scale, self.gridlines);

        queue!(
            stdout,
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0),
        )?;

        for line in self.cam.render().lines() {
            queue!(stdout, style::Print(line), cursor::MoveToNextLine(1))?;
        }

        let status = format!(
            "generation {}  population {}  {:.1} ticks/s{}{}  [q]uit [space] pause [n]ext [r]eseed",
            engine.generation(),
            engine.population(),
            self.meter.rate,
            if self.paused { "  (paused)" } else { "" },
            if self.cropped { "  (cropped)" } else { "" },
        );
        queue!(stdout, style::Print(status))?;

        stdout.flush()
    }
}

fn run_interactive(engine: &mut Engine, config: &Config, gridlines: bool) -> anyhow::Result<()> {
    let frame_time = config.frame_time();
    let mut stdout = io::stdout();

    let (cols, rows) = terminal::size().context("Failed to read the terminal size")?;
    let mut host = Host::new(cols, rows, gridlines, engine);

    loop {
        let t = Instant::now();
        let mut step = !host.paused;

        // Poll events for as long as a tick lasts
        if event::poll(frame_time)? {
            match handle_event(event::read()?) {
                None => {}
                Some(Event::Exit) => break,
                Some(Event::TogglePause) => {
                    host.paused = !host.paused;
                    step = false;
                }
                Some(Event::Step) => step = true,
                Some(Event::Reseed) => {
                    let seed = rand::random();
                    engine.reseed(seed, config.live_probability)?;

                    info!(seed, "reseeded grid");
                }
                Some(Event::Resize { cols, rows }) => host.resize(cols, rows, engine),
            }
        }

        if step {
            engine.advance();
            host.meter.tick();
        }

        host.draw(engine, &mut stdout)?;

        thread::sleep(frame_time.saturating_sub(t.elapsed()));
    }

    Ok(())
}

/// Set up the terminal, run the interactive view, and restore the terminal even if the view fails.
fn run_terminal(engine: &mut Engine, config: &Config, gridlines: bool) -> anyhow::Result<()> {
    warn_if_cropped(engine)?;

    terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();

    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)
        .context("Failed to enter the alternate screen")?;

    let res = run_interactive(engine, config, gridlines);

    let restored = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen)
        .and_then(|_| terminal::disable_raw_mode());

    res?;
    restored.context("Failed to restore the terminal")?;

    Ok(())
}

/// Warn about a grid that won't fit the terminal while stderr still shows up as plain lines.
fn warn_if_cropped(engine: &Engine) -> anyhow::Result<()> {
    let (cols, rows) = terminal::size().context("Failed to read the terminal size")?;
    let cam = Camera::new(cols, rows.saturating_sub(1));
    let grid = engine.grid();

    if !cam.fits(grid.width(), grid.height()) {
        warn!(
            grid_width = grid.width(),
            grid_height = grid.height(),
            dots_width = cam.width(),
            dots_height = cam.height(),
            "grid doesn't fit the terminal, it will be cropped"
        );
    }

    Ok(())
}

fn run_headless(engine: &mut Engine, generations: u64) {
    let start = Instant::now();
    engine.step(generations);
    let elapsed = start.elapsed();

    info!(generations, ?elapsed, "finished headless run");

    println!("{}", engine.grid());
    println!(
        "generation {}  population {}  seed {}",
        engine.generation(),
        engine.population(),
        engine
            .seed()
            .map_or_else(|| "none".to_string(), |s| s.to_string()),
    );
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .init();

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_file.as_deref())?;

    let config = args.config();

    let mut engine = Engine::from_config(&config).context("Invalid configuration")?;

    match args.generations {
        Some(n) => run_headless(&mut engine, n),
        None => run_terminal(&mut engine, &config, args.gridlines)?,
    }

    Ok(())
}
