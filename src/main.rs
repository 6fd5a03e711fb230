mod app;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use app::App;
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing::{info, warn};

use tui_globe::config::{default_config_dir, CliArgs, Config};
use tui_globe::data::{self, Atlas};
use tui_globe::logging::init_logging;

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let (mut config, config_error) = match Config::load_or_create(&config_dir) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_cli_overrides(&args);

    init_logging(config.log.file_path().as_deref(), &config.log.level);
    if let Some(e) = config_error {
        warn!("using default config: {e}");
    }
    info!(dir = %config_dir.display(), "starting tui-globe");

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, config, args.goto);

    // Disable mouse capture and restore terminal
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn run(terminal: &mut DefaultTerminal, config: Config, goto: Option<(f64, f64)>) -> Result<()> {
    let size = terminal.size()?;
    let mut app = if config.data.builtin {
        App::with_atlas(size.width, size.height, config, goto, Arc::new(Atlas::builtin()))
    } else {
        let loader = data::spawn_loader(config.data.paths())?;
        App::new(size.width, size.height, config, goto, loader)
    };

    // Main loop
    loop {
        app.tick(Instant::now());

        // Rasterize only when something asked for a frame
        app.paint();
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        app.handle_key(key.code);
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse, Instant::now()),
                Event::Resize(width, height) => app.resize(width, height, Instant::now()),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    info!("bye");
    Ok(())
}
