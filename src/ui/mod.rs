//! Terminal output for the CLI
//!
//! Uses `cliclack` in interactive terminals and falls back to plain,
//! bracket-tagged lines when piped or running under CI.

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{key_value, remark, section, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint};
pub use progress::TaskSpinner;
pub use prompts::confirm;
pub use theme::{init_theme, OverlayTheme};
