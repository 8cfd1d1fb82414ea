use crate::cli::{
    ClickArgs, ClickAtArgs, Cli, Commands, DragArgs, FindArgs, MoveArgs, ScrollArgs, TargetArgs,
    TypeArgs, WaitArgs, WindowsArgs,
};
use crate::utils::{parse_point, print_report};
use anyhow::{anyhow, bail, Result};
use colored::Colorize;
use deskpilot::platforms::memory::{MemoryDesktop, RecordingSink};
use deskpilot::platforms::WindowSource;
use deskpilot::{
    create_platform, parse_selector, parse_window_selector, AutomationConfig, ClickOptions,
    Desktop, DragOptions, SearchBudget, UiElement, VirtualDesktop, WaitState, WindowCriterion,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Defaults, then the --config file, then DESKPILOT_* variables
fn load_config(cli: &Cli) -> Result<AutomationConfig> {
    let mut config = match &cli.config {
        Some(path) => AutomationConfig::from_file(path)?,
        None => AutomationConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

pub fn build_desktop(cli: &Cli) -> Result<Desktop> {
    let config = load_config(cli)?;
    if !cli.dry_run {
        return Ok(Desktop::new(create_platform()?, config));
    }

    let sink = Arc::new(RecordingSink::logging());
    let platform = match create_platform() {
        Ok(platform) => platform.with_input(sink),
        Err(e) => {
            warn!("{e}; dry run continues against an empty in-memory desktop");
            MemoryDesktop::with_sink(VirtualDesktop::new(0, 0, 1920, 1080), sink).platform()
        }
    };
    info!("dry run: input is logged, not injected");
    Ok(Desktop::new(platform, config).with_sleep(Arc::new(|_| {})))
}

/// Wait for the target to exist, up to its timeout
async fn resolve(desktop: &Desktop, target: &TargetArgs) -> Result<UiElement> {
    let locator = desktop.locator_from_selectors(target.window.as_deref(), &target.selector)?;
    let outcome = desktop
        .wait_for(
            &locator,
            WaitState::Exists,
            target.timeout_ms.map(Duration::from_millis),
        )
        .await?;
    outcome
        .value
        .ok_or_else(|| anyhow!("no element matched '{}'", target.selector))
}

fn window_target(window: Option<&str>) -> Result<(WindowCriterion, i32)> {
    Ok(match window {
        Some(selector) => parse_window_selector(selector)?,
        None => (WindowCriterion::default(), 0),
    })
}

fn list_windows(desktop: &Desktop, args: WindowsArgs) -> Result<()> {
    let windows = if args.all {
        desktop.platform().windows.list_top_level_windows(false, true)?
    } else {
        desktop.list_windows()?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
        return Ok(());
    }
    for w in &windows {
        let title = if w.title.is_empty() {
            "(untitled)".dimmed().to_string()
        } else {
            w.title.bold().to_string()
        };
        println!(
            "{:>12}  {:<8} {:<24} {}",
            w.handle.to_string().cyan(),
            w.process_id,
            w.process_name,
            title
        );
    }
    println!("{}", format!("{} windows", windows.len()).dimmed());
    Ok(())
}

fn find(desktop: &Desktop, args: FindArgs) -> Result<()> {
    let (criterion, index) = parse_selector(&args.target.selector)?;
    let (window, window_index) = window_target(args.target.window.as_deref())?;

    let mut budget = SearchBudget::default().with_traversal(args.traversal.into());
    if let Some(ms) = args.target.timeout_ms {
        budget = budget.with_timeout(Duration::from_millis(ms));
    }
    if let Some(nodes) = args.max_nodes {
        budget = budget.with_max_nodes(nodes);
    }
    if let Some(depth) = args.max_depth {
        budget = budget.with_max_depth(depth);
    }

    let (element, stats) =
        desktop.find_element_with_stats(&window, window_index, &criterion, index, &budget)?;

    if args.stats {
        match &stats {
            Some(s) => eprintln!(
                "{} {:?} visited {} nodes in {:?}, {:?}",
                "stats:".dimmed(),
                s.strategy,
                s.visited,
                s.elapsed,
                s.termination
            ),
            None => eprintln!("{} window did not resolve", "stats:".dimmed()),
        }
    }

    match element {
        Some(element) => {
            println!("{}", serde_json::to_string_pretty(&element.info())?);
            Ok(())
        }
        None => bail!("no element matched '{}'", args.target.selector),
    }
}

async fn click(desktop: &Desktop, args: ClickArgs) -> Result<()> {
    let element = resolve(desktop, &args.target).await?;
    let options = ClickOptions {
        button: args.button.into(),
        ..ClickOptions::default()
    };
    let report = if args.double {
        desktop.double_click(&element, options)?
    } else {
        desktop.click(&element, options)?
    };
    print_report(&format!("clicked {}", element.describe()), &report);
    Ok(())
}

fn click_at(desktop: &Desktop, args: ClickAtArgs) -> Result<()> {
    let options = ClickOptions {
        button: args.button.into(),
        ..ClickOptions::default()
    };
    let report = desktop.click_at(deskpilot::Point::new(args.x, args.y), options)?;
    print_report(&format!("clicked ({}, {})", args.x, args.y), &report);
    Ok(())
}

async fn type_text(desktop: &Desktop, args: TypeArgs) -> Result<()> {
    let target = match args.into {
        Some(selector) => {
            let target = TargetArgs {
                selector,
                window: args.window,
                timeout_ms: None,
            };
            Some(resolve(desktop, &target).await?)
        }
        None => None,
    };
    let report = desktop.type_text(target.as_ref(), &args.text, args.delay_ms)?;
    print_report(
        &format!("typed {} characters", args.text.chars().count()),
        &report,
    );
    Ok(())
}

fn drag(desktop: &Desktop, args: DragArgs) -> Result<()> {
    let from = parse_point(&args.from)?;
    let to = parse_point(&args.to)?;
    let config = desktop.config();
    let options = DragOptions {
        button: args.button.into(),
        steps: args.steps.unwrap_or(config.drag_steps),
        settle_ms: config.drag_settle_ms,
        ..DragOptions::default()
    };
    let report = desktop.drag(from, to, Some(options))?;
    print_report(&format!("dragged {} -> {}", args.from, args.to), &report);
    Ok(())
}

fn scroll(desktop: &Desktop, args: ScrollArgs) -> Result<()> {
    let at = args.at.as_deref().map(parse_point).transpose()?;
    let report = desktop.scroll(at, args.vertical, args.horizontal)?;
    print_report("scrolled", &report);
    Ok(())
}

async fn wait(desktop: &Desktop, args: WaitArgs) -> Result<()> {
    let locator =
        desktop.locator_from_selectors(args.target.window.as_deref(), &args.target.selector)?;
    let outcome = desktop
        .wait_for(
            &locator,
            args.state,
            args.target.timeout_ms.map(Duration::from_millis),
        )
        .await?;
    let subject = outcome
        .value
        .as_ref()
        .map(UiElement::describe)
        .unwrap_or_else(|| args.target.selector.clone());
    println!(
        "{} {} is {} after {:?} ({} polls)",
        "✓".green(),
        subject,
        args.state,
        outcome.elapsed,
        outcome.polls
    );
    Ok(())
}

fn move_pointer(desktop: &Desktop, args: MoveArgs) -> Result<()> {
    let report = desktop.move_mouse(
        deskpilot::Point::new(args.x, args.y),
        args.steps,
        args.step_delay_ms,
    )?;
    print_report(&format!("moved to ({}, {})", args.x, args.y), &report);
    Ok(())
}

pub async fn handle_command(desktop: &Desktop, command: Commands) -> Result<()> {
    match command {
        Commands::Windows(args) => list_windows(desktop, args),
        Commands::Find(args) => find(desktop, args),
        Commands::Click(args) => click(desktop, args).await,
        Commands::ClickAt(args) => click_at(desktop, args),
        Commands::Type(args) => type_text(desktop, args).await,
        Commands::Key(args) => {
            let report = desktop.press_key(&args.key, args.repeat, args.delay_ms)?;
            print_report(&format!("pressed {}", args.key), &report);
            Ok(())
        }
        Commands::Hotkey(args) => {
            let keys: Vec<&str> = args.chord.split('+').collect();
            let report = desktop.hotkey(&keys)?;
            print_report(&format!("pressed {}", args.chord), &report);
            Ok(())
        }
        Commands::Drag(args) => drag(desktop, args),
        Commands::Scroll(args) => scroll(desktop, args),
        Commands::Wait(args) => wait(desktop, args).await,
        Commands::Move(args) => move_pointer(desktop, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ButtonArg, TraversalArg};
    use deskpilot::platforms::memory::{window_info, MemoryNode};
    use deskpilot::{ControlType, InputEvent, KeyState, MouseButton, Rect};

    fn fixture() -> (MemoryDesktop, Desktop) {
        let memory = MemoryDesktop::default();
        let window = memory.add_window(window_info(0x10, "Calculator", 7, "calc.exe"));
        memory.tree.add_child(
            window,
            MemoryNode::new(ControlType::Button, "Seven").bounds(Rect::new(10.0, 10.0, 20.0, 20.0)),
        );
        let desktop = Desktop::new(memory.platform(), AutomationConfig::default())
            .with_sleep(Arc::new(|_| {}));
        (memory, desktop)
    }

    fn target(selector: &str) -> TargetArgs {
        TargetArgs {
            selector: selector.to_string(),
            window: Some("title:Calculator".to_string()),
            timeout_ms: Some(200),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_command_presses_requested_button() {
        let (memory, desktop) = fixture();
        let args = ClickArgs {
            target: target("role:Button && name:Seven"),
            button: ButtonArg::Right,
            double: false,
        };

        handle_command(&desktop, Commands::Click(args)).await.unwrap();

        let events = memory.sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            InputEvent::button(MouseButton::Right, KeyState::Down)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_command_missing_element_times_out() {
        let (memory, desktop) = fixture();
        let args = ClickArgs {
            target: target("name:Eight"),
            button: ButtonArg::Left,
            double: false,
        };

        let err = handle_command(&desktop, Commands::Click(args))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert!(memory.sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_find_reports_missing_element() {
        let (_memory, desktop) = fixture();
        let args = FindArgs {
            target: target("name:Nine"),
            max_nodes: Some(100),
            max_depth: None,
            traversal: TraversalArg::Control,
            stats: false,
        };

        assert!(handle_command(&desktop, Commands::Find(args)).await.is_err());
    }

    #[tokio::test]
    async fn test_hotkey_command_splits_chord() {
        let (memory, desktop) = fixture();

        handle_command(
            &desktop,
            Commands::Hotkey(crate::cli::HotkeyArgs {
                chord: "ctrl+c".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(memory.sink.events().len(), 4);
    }
}
