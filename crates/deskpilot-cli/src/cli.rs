use clap::{Args, Parser, Subcommand, ValueEnum};
use deskpilot::{MouseButton, TraversalKind, WaitState};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deskpilot")]
#[command(about = "Find desktop UI elements and drive them with synthetic input")]
#[command(
    long_about = "deskpilot resolves windows and elements through the accessibility tree and sends pointer and keyboard input to them. Selectors look like 'role:Button && name:OK'; window selectors like 'title~:Notepad'."
)]
#[command(version)]
pub struct Cli {
    /// JSON file with automation settings (DESKPILOT_* variables override it)
    #[clap(long, global = true, env = "DESKPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log input batches instead of injecting them
    #[clap(long, global = true)]
    pub dry_run: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[clap(long, short, global = true)]
    pub verbose: bool,

    /// Abort the process if the command has not finished after this many ms
    #[clap(long, global = true, env = "DESKPILOT_WATCHDOG_MS")]
    pub watchdog_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
#[clap(rename_all = "lower")]
pub enum ButtonArg {
    #[default]
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl From<ButtonArg> for MouseButton {
    fn from(arg: ButtonArg) -> Self {
        match arg {
            ButtonArg::Left => MouseButton::Left,
            ButtonArg::Right => MouseButton::Right,
            ButtonArg::Middle => MouseButton::Middle,
            ButtonArg::X1 => MouseButton::X1,
            ButtonArg::X2 => MouseButton::X2,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
#[clap(rename_all = "lower")]
pub enum TraversalArg {
    Raw,
    #[default]
    Control,
    Content,
}

impl From<TraversalArg> for TraversalKind {
    fn from(arg: TraversalArg) -> Self {
        match arg {
            TraversalArg::Raw => TraversalKind::Raw,
            TraversalArg::Control => TraversalKind::Control,
            TraversalArg::Content => TraversalKind::Content,
        }
    }
}

/// Where to look for an element
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Element selector, e.g. "role:Button && name:OK"
    pub selector: String,

    /// Window selector, e.g. "title~:Notepad". Omit to search from the desktop root.
    #[clap(long, short = 'w')]
    pub window: Option<String>,

    /// How long to wait for the element to appear
    #[clap(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct WindowsArgs {
    /// Include hidden and untitled windows
    #[clap(long)]
    pub all: bool,

    /// Print JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FindArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Node budget for the bounded traversal
    #[clap(long)]
    pub max_nodes: Option<usize>,

    /// Depth limit below the window root
    #[clap(long)]
    pub max_depth: Option<usize>,

    /// Which nodes count as elements
    #[clap(long, value_enum, default_value_t = TraversalArg::Control)]
    pub traversal: TraversalArg,

    /// Print search statistics
    #[clap(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct ClickArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[clap(long, short = 'b', value_enum, default_value_t = ButtonArg::Left)]
    pub button: ButtonArg,

    /// Double-click instead of a single click
    #[clap(long)]
    pub double: bool,
}

#[derive(Args, Debug)]
pub struct ClickAtArgs {
    #[clap(allow_hyphen_values = true)]
    pub x: f64,
    #[clap(allow_hyphen_values = true)]
    pub y: f64,

    #[clap(long, short = 'b', value_enum, default_value_t = ButtonArg::Left)]
    pub button: ButtonArg,
}

#[derive(Args, Debug)]
pub struct TypeArgs {
    /// Literal text to type
    pub text: String,

    /// Click this element first
    #[clap(long)]
    pub into: Option<String>,

    /// Window selector for --into
    #[clap(long, short = 'w')]
    pub window: Option<String>,

    /// Pause between characters
    #[clap(long, default_value_t = 0)]
    pub delay_ms: u64,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Key token: a name (enter, f5, ctrl), a letter or digit, or a code (0x41, 65)
    pub key: String,

    #[clap(long, default_value_t = 1)]
    pub repeat: u32,

    #[clap(long, default_value_t = 0)]
    pub delay_ms: u64,
}

#[derive(Args, Debug)]
pub struct HotkeyArgs {
    /// Chord such as "ctrl+shift+p"
    pub chord: String,
}

#[derive(Args, Debug)]
pub struct DragArgs {
    /// Start point as "x,y"
    #[clap(allow_hyphen_values = true)]
    pub from: String,

    /// End point as "x,y"
    #[clap(allow_hyphen_values = true)]
    pub to: String,

    #[clap(long)]
    pub steps: Option<u32>,

    #[clap(long, short = 'b', value_enum, default_value_t = ButtonArg::Left)]
    pub button: ButtonArg,
}

#[derive(Args, Debug)]
pub struct ScrollArgs {
    /// Vertical notches, positive scrolls up
    #[clap(allow_hyphen_values = true)]
    pub vertical: i32,

    /// Horizontal notches, positive scrolls right
    #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
    pub horizontal: i32,

    /// Move the pointer to "x,y" first
    #[clap(long, allow_hyphen_values = true)]
    pub at: Option<String>,
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// exists, not-exists, enabled or visible
    #[clap(long, default_value = "exists")]
    pub state: WaitState,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    #[clap(allow_hyphen_values = true)]
    pub x: f64,
    #[clap(allow_hyphen_values = true)]
    pub y: f64,

    /// Glide in this many steps from the current position
    #[clap(long, default_value_t = 1)]
    pub steps: u32,

    #[clap(long, default_value_t = 0)]
    pub step_delay_ms: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List top-level windows
    Windows(WindowsArgs),
    /// Resolve an element and print what was found
    Find(FindArgs),
    /// Click the centre of an element
    Click(ClickArgs),
    /// Click a screen point
    ClickAt(ClickAtArgs),
    /// Type literal text
    Type(TypeArgs),
    /// Tap one key
    Key(KeyArgs),
    /// Press a key chord
    Hotkey(HotkeyArgs),
    /// Drag between two screen points
    Drag(DragArgs),
    /// Turn the mouse wheel
    Scroll(ScrollArgs),
    /// Wait for an element to reach a state
    Wait(WaitArgs),
    /// Move the pointer
    Move(MoveArgs),
}
