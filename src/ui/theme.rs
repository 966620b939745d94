use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// When the CLI colors its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    /// Only on a terminal that has not disabled colors (`NO_COLOR`, `CLICOLOR=0`)
    #[default]
    Auto,
    Always,
    Never,
}

/// Styles by the role text plays in the inspection output.
#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub ok: Style,
    pub failure: Style,
    pub caution: Style,
    pub accent: Style,
    pub label: Style,
    /// Stored `CREATE TABLE` statements
    pub sql: Style,
    /// Database, table and column names
    pub name: Style,
}

impl Theme {
    pub fn for_mode(mode: ColorMode) -> Self {
        let colored = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => console::Term::stdout().is_term() && console::colors_enabled(),
        };
        if colored { Self::colored() } else { Self::plain() }
    }

    pub fn colored() -> Self {
        Self {
            heading: Style::new().cyan().bold(),
            ok: Style::new().green().bold(),
            failure: Style::new().red().bold(),
            caution: Style::new().yellow().bold(),
            accent: Style::new().magenta(),
            label: Style::new().white().dimmed(),
            sql: Style::new().bright_black(),
            name: Style::new().blue().bold(),
        }
    }

    pub fn plain() -> Self {
        let none = Style::new();
        Self {
            heading: none,
            ok: none,
            failure: none,
            caution: none,
            accent: none,
            label: none,
            sql: none,
            name: none,
        }
    }
}

/// Fix the color mode. Only the first call has an effect.
pub fn init(mode: ColorMode) -> &'static Theme {
    THEME.get_or_init(|| Theme::for_mode(mode))
}

pub fn theme() -> &'static Theme {
    init(ColorMode::Auto)
}
