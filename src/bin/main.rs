use anyhow::anyhow;
use clap::Parser;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::{StyledContent, Stylize};
use crossterm::terminal::{Clear, ClearType};
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use units_core::core::converter::format_value;
use units_core::core::types::{MultiResult, UnitDef};
use units_core::history::HistoryEntry;
use units_core::rates::{HttpRateSource, RateStatus};
use units_core::settings::Theme;
use units_core::view::{Renderer, ViewController, ViewMode};
use units_core::{Category, Config, ConverterEngine};

const TICK: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "converter", about = "Interactive unit converter")]
struct Args {
    /// Directory for history, theme and cached rates
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Endpoint returning `{"rates": {"EUR": ..}}` relative to USD
    #[arg(long)]
    rates_url: Option<String>,
    /// Never touch the network
    #[arg(long)]
    offline: bool,
}

fn draw(view: &ViewController<TerminalRenderer>) -> std::io::Result<()> {
    view.renderer().draw(view.input(), view.selection(), view.mode())
}

enum Flow {
    Continue,
    Exit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = Config::from_env()?.with_overrides(args.data_dir, args.rates_url, args.offline);
    let mut engine = ConverterEngine::from_config(&config)?;
    let updater = engine
        .rate_updater()
        .ok_or_else(|| anyhow!("rate updater already taken"))?;

    let renderer = TerminalRenderer::new(engine.theme());
    let mut view = ViewController::new(engine, renderer);
    view.start();

    let mut rates_task = if config.offline {
        view.rates_updated(updater.load_cached().unwrap_or(RateStatus::Offline));
        None
    } else {
        Some(updater.spawn(HttpRateSource::new(config.rates_url.clone())))
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK);
    draw(&view)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Flow::Exit = handle_command(&mut view, line.trim()) {
                    break;
                }
            }
            _ = ticker.tick() => {
                if !view.tick() {
                    continue;
                }
            }
            status = wait_for_rates(&mut rates_task) => {
                view.rates_updated(status);
            }
        }
        draw(&view)?;
    }

    println!("\nGoodbye.");
    Ok(())
}

/// Resolves once the background refresh finishes; pending forever after.
async fn wait_for_rates(task: &mut Option<JoinHandle<RateStatus>>) -> RateStatus {
    let Some(handle) = task else {
        return std::future::pending().await;
    };
    let status = handle.await.unwrap_or_else(|e| {
        log::error!("Rate refresh task failed: {}", e);
        RateStatus::Offline
    });
    *task = None;
    status
}

fn handle_command(view: &mut ViewController<TerminalRenderer>, cmd: &str) -> Flow {
    view.renderer_mut().notice = None;
    let (word, arg) = cmd.split_once(' ').unwrap_or((cmd, ""));
    let arg = arg.trim();

    match word {
        "exit" | "quit" => return Flow::Exit,
        ":cat" => match arg.parse::<Category>() {
            Ok(category) => view.switch_category(category),
            Err(e) => view.renderer_mut().notice = Some(e.to_string()),
        },
        ":from" => {
            if let Err(e) = view.set_from(arg) {
                view.renderer_mut().notice = Some(e.to_string());
            }
        }
        ":to" => {
            if let Err(e) = view.set_to(arg) {
                view.renderer_mut().notice = Some(e.to_string());
            }
        }
        ":swap" => view.swap_units(),
        ":multi" => view.set_view(ViewMode::Multi),
        ":single" => view.set_view(ViewMode::Single),
        ":clear" => view.clear_history(),
        ":theme" => match view.engine_mut().toggle_theme() {
            Ok(theme) => view.renderer_mut().theme = theme,
            Err(e) => view.renderer_mut().notice = Some(format!("Could not save theme: {}", e)),
        },
        s if s.starts_with(':') => {
            view.renderer_mut().notice = Some(format!("Unknown command '{}'", s));
        }
        _ => view.set_input(cmd),
    }
    Flow::Continue
}

/// Keeps the last rendered state and redraws the whole screen on demand.
struct TerminalRenderer {
    theme: Theme,
    title: String,
    units: Vec<(&'static str, &'static str)>,
    single: Option<f64>,
    multi: Option<Vec<MultiResult>>,
    history: Vec<HistoryEntry>,
    indicator: Option<String>,
    notice: Option<String>,
}

impl TerminalRenderer {
    fn new(theme: Theme) -> Self {
        Self {
            theme,
            title: String::new(),
            units: Vec::new(),
            single: None,
            multi: None,
            history: Vec::new(),
            indicator: None,
            notice: None,
        }
    }

    fn accent<'a>(&self, s: &'a str) -> StyledContent<&'a str> {
        match self.theme {
            Theme::Dark => s.cyan().bold(),
            Theme::Light => s.dark_blue().bold(),
        }
    }

    fn label_of(&self, key: &str) -> String {
        self.units
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| key.to_string())
    }

    fn draw(&self, input: &str, (from, to): (&str, &str), mode: ViewMode) -> std::io::Result<()> {
        let mut out = stdout();
        execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;

        writeln!(out, "{}", self.accent(&self.title))?;
        writeln!(out, "---------------------------------------------------------------")?;
        writeln!(out, "Type a number to convert. Commands: :cat <name>, :from <unit>, :to <unit>,")?;
        writeln!(out, ":swap, :multi, :single, :clear, :theme. 'exit' to quit.\n")?;

        let keys: Vec<&str> = self.units.iter().map(|(k, _)| *k).collect();
        writeln!(out, "Units: {}", keys.join(", "))?;
        if let Some(indicator) = &self.indicator {
            writeln!(out, "{}", indicator.as_str().dim())?;
        }

        writeln!(out, "\nInput: [{}] {}", input, self.label_of(from))?;
        match mode {
            ViewMode::Single => {
                let value = self.single.map(format_value).unwrap_or_default();
                writeln!(out, "Result -> {} {}", self.accent(&value), self.label_of(to))?;
            }
            ViewMode::Multi => {
                writeln!(out)?;
                for result in self.multi.iter().flatten() {
                    let marker = if result.is_source { "*" } else { " " };
                    writeln!(out, " {} {:<24} {}", marker, result.label, format_value(result.value))?;
                }
            }
        }

        writeln!(out, "\nHistory:")?;
        if self.history.is_empty() {
            writeln!(out, "  No conversion history yet")?;
        }
        for entry in &self.history {
            writeln!(
                out,
                "  {} {} = {} {}  {}  {}",
                format_value(entry.input_value),
                entry.input_unit,
                format_value(entry.output_value),
                entry.output_unit,
                entry.timestamp.as_str().dim(),
                entry.category_label
            )?;
        }

        if let Some(notice) = &self.notice {
            writeln!(out, "\n{}", notice.as_str().red())?;
        }
        write!(out, "\n> ")?;
        out.flush()
    }
}

impl Renderer for TerminalRenderer {
    fn category_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn populate_units(&mut self, _category: Category, units: &[UnitDef], _from: &str, _to: &str) {
        self.units = units.iter().map(|u| (u.key, u.label)).collect();
    }

    // The prompt line always echoes the controller's input, so only say why it changed.
    fn render_input(&mut self, text: &str) {
        self.notice = Some(format!("Negative values are only allowed for temperature, using {}", text));
    }

    fn render_single(&mut self, value: Option<f64>) {
        self.single = value;
    }

    fn render_multi(&mut self, results: Option<&[MultiResult]>) {
        self.multi = results.map(|r| r.to_vec());
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.history = entries.to_vec();
    }

    fn rate_indicator(&mut self, message: Option<&str>) {
        self.indicator = message.map(str::to_string);
    }
}
