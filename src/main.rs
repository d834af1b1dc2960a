use anyhow::{ensure, Context, Result};
use bubble_map::app::App;
use bubble_map::config::{Config, MetricConfig};
use bubble_map::data::{self, Accessor, Geography, NumberFormat};
use bubble_map::map::{GeoIndex, Renderer};
use bubble_map::ui;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Interactive world bubble map in the terminal
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML config file; CLI flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// TopoJSON topology or GeoJSON FeatureCollection
    #[arg(short, long)]
    geo: Option<PathBuf>,
    /// Tabular data (TSV, or CSV by extension)
    #[arg(short, long)]
    data: Option<PathBuf>,
    /// Topology object holding the countries
    #[arg(long)]
    object: Option<String>,
    /// Metric as `field:Name[:grouped|si|fixedN]`, repeatable
    #[arg(short, long, value_parser = parse_metric)]
    metric: Vec<MetricConfig>,
    /// Write logs here; stdout belongs to the UI
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_metric(s: &str) -> std::result::Result<MetricConfig, String> {
    let mut parts = s.splitn(3, ':');
    let field = parts.next().filter(|f| !f.is_empty()).ok_or("missing field")?;
    let name = parts.next().unwrap_or(field);
    let format = match parts.next() {
        None | Some("grouped") => NumberFormat::Grouped,
        Some("si") => NumberFormat::Si,
        Some(other) => match other.strip_prefix("fixed").map(str::parse::<u8>) {
            Some(Ok(decimals)) => NumberFormat::Fixed(decimals),
            _ => return Err(format!("unknown format `{other}`")),
        },
    };
    Ok(MetricConfig {
        field: field.to_string(),
        name: name.to_string(),
        format,
    })
}

fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(geo) = &args.geo {
        config.geography = geo.clone();
    }
    if let Some(data) = &args.data {
        config.data = data.clone();
    }
    if let Some(object) = &args.object {
        config.object = object.clone();
    }
    if !args.metric.is_empty() {
        config.metrics = args.metric.clone();
    }
    Ok(config)
}

/// Everything that can fail happens here, before the terminal is taken over
fn load(config: &Config) -> Result<Renderer> {
    ensure!(!config.metrics.is_empty(), "no metrics configured");

    let geography = Geography::from_file(&config.geography)
        .with_context(|| format!("loading geography {}", config.geography.display()))?;
    let index = GeoIndex::build(
        geography,
        &config.object,
        &config.excluded_id,
        &config.antimeridian_id,
    )
    .with_context(|| format!("indexing object `{}`", config.object))?;

    let accessor = Accessor::new(&config.id_field, &config.name_field);
    let rows = data::load_table(&config.data, &accessor)
        .with_context(|| format!("loading data {}", config.data.display()))?;

    Ok(Renderer::new(
        index,
        rows,
        accessor,
        &config.excluded_id,
        config.render.clone(),
    ))
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let config = load_config(&args)?;
    let renderer = load(&config)?;
    let metrics = data::metrics_from_config(&config.metrics);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let mut app = App::new(
        renderer,
        config.legend,
        metrics,
        size.width,
        size.height,
        Instant::now(),
    );

    // Run the app
    let result = run(&mut terminal, &mut app);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for hover, panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved => app.pointer_moved(mouse.column, mouse.row),
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(30.0, 0.0),
        MouseEventKind::ScrollRight => app.pan(-30.0, 0.0),
        // Click and drag to pan
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        // Draw
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(20.0, 0.0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(-20.0, 0.0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0.0, 24.0),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0.0, -24.0),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            KeyCode::Char('m') | KeyCode::Char('M') => app.cycle_metric(Instant::now()),

                            // Reset view
                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset_zoom(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(app, mouse);
                }
                Event::Resize(width, height) => {
                    app.resize(width, height, Instant::now());
                }
                _ => {}
            }
        }

        // Advance bubble transitions
        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric() {
        let metric = parse_metric("gdp_md_est:GDP:si").unwrap();
        assert_eq!(metric.field, "gdp_md_est");
        assert_eq!(metric.name, "GDP");
        assert_eq!(metric.format, NumberFormat::Si);

        assert_eq!(parse_metric("pop_est").unwrap().name, "pop_est");
        assert_eq!(
            parse_metric("x:X:fixed2").unwrap().format,
            NumberFormat::Fixed(2)
        );
        assert!(parse_metric("x:X:roman").is_err());
        assert!(parse_metric("").is_err());
    }
}
