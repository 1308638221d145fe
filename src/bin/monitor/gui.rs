use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Constraint,
    style::{Color, Style},
    widgets::{Block, Borders, Row, Table},
    Frame, Terminal,
};
use std::{
    error::Error,
    io,
    time::{Duration, Instant},
};

use mocaprelay::connection::{ConnectionStatus, ConnectionView};

type ViewGenerator = Box<dyn FnMut() -> Vec<ConnectionView>>;

struct App {
    views_generator: ViewGenerator,
    views: Vec<ConnectionView>,
}

impl App {
    fn new(views_generator: ViewGenerator) -> App {
        App {
            views_generator,
            views: vec![],
        }
    }

    fn on_tick(&mut self) {
        self.views = (self.views_generator)();
    }
}

pub fn engage_gui(views_generator: ViewGenerator) -> Result<(), Box<dyn Error>> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let tick_rate = Duration::from_millis(250);
    let app = App::new(views_generator);
    let res = run_app(&mut terminal, app, tick_rate);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') = key.code {
                    return Ok(());
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn status_style(status: ConnectionStatus) -> Style {
    match status {
        ConnectionStatus::Connecting => Style::default().fg(Color::Yellow),
        ConnectionStatus::Connected => Style::default().fg(Color::Green),
        ConnectionStatus::Disconnected => Style::default().fg(Color::Gray),
        ConnectionStatus::Error => Style::default().fg(Color::Red),
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows: Vec<Row> = app
        .views
        .iter()
        .map(|view| {
            let [w, x, y, z] = view.sample.components();
            Row::new(vec![
                view.target.clone(),
                view.status.to_string(),
                view.endpoint.clone().unwrap_or_else(|| "(playback)".into()),
                format!("{:+.3} {:+.3} {:+.3} {:+.3}", w, x, y, z),
                format!(
                    "{:+.2} {:+.2} {:+.2}",
                    view.offset.x, view.offset.y, view.offset.z
                ),
            ])
            .style(status_style(view.status))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(24),
            Constraint::Length(32),
            Constraint::Min(20),
        ],
    )
    .header(Row::new(vec![
        "Target",
        "Status",
        "Endpoint",
        "Rotation (w x y z)",
        "Offset (x y z)",
    ]))
    .block(
        Block::default()
            .title("Connections ('q' to quit)")
            .borders(Borders::ALL),
    );

    f.render_widget(table, f.size());
}
