//src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io::stdout;
use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use kw8_nav::{
    route, AppService, DetailView, LocationSource, LocationTarget, MemoryHistory, Modal, NavKind, NavOptions,
    NavOutcome, Navigator, PageState, RouteTarget, UserContext,
};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Installs the subscriber before anything can log. Without `RUST_LOG` it
/// starts at `warn` until the configured level is known.
fn init_logging() -> Option<FilterHandle> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_set = from_env.is_some();
    let (filter, handle) = reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new("warn")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .ok()?;
    (!env_set).then_some(handle)
}

fn apply_configured_level(handle: Option<FilterHandle>, level: &str) {
    let Some(handle) = handle else { return };
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            let _ = handle.reload(filter);
        }
        Err(e) => tracing::warn!(level, error = %e, "Ignoring invalid log level from config"),
    }
}

fn main() -> Result<()> {
    let cli_args = cli::parse_args();

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let log_handle = init_logging();
    let mut service = AppService::initialize().context("Failed to initialize application service")?;
    apply_configured_level(log_handle, &service.config.log_level);

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Parse { url } => {
            let parsed = kw8_nav::parse_href(&url);
            let mut table = header_table(&["Field", "Value"]);
            let target = match parsed.target {
                LocationTarget::Page(page) => format!("page {page}"),
                LocationTarget::ModalOnly(modal) => format!("modal {modal} (page unchanged)"),
            };
            table.add_row(vec![Cell::new("Target"), Cell::new(target)]);
            table.add_row(vec![Cell::new("Plan id"), Cell::new(or_dash(parsed.params.plan_id.as_deref()))]);
            table.add_row(vec![
                Cell::new("Workout link"),
                Cell::new(or_dash(parsed.params.workout_link_id.as_deref())),
            ]);
            table.add_row(vec![Cell::new("Variant"), Cell::new(or_dash(parsed.params.variant_id.as_deref()))]);
            if let Some(fallback) = parsed.fallback {
                table.add_row(vec![
                    Cell::new("Fallback"),
                    Cell::new(format!("{fallback:?}")).fg(Color::Yellow),
                ]);
            }
            println!("{table}");
        }
        cli::Commands::Navigate { target, plan_id, link_or_variant, from, keep_tab, user } => {
            let user_ctx = service.user_context(user.as_deref())?;
            let mut nav = service.navigator_at(&from);
            resolve(&service, &mut nav, user_ctx.as_ref());
            let outcome = nav.navigate_with(
                &target,
                NavOptions {
                    plan_id: plan_id.as_deref(),
                    link_or_variant: link_or_variant.as_deref(),
                    preserve_tab: keep_tab,
                },
            );
            print_outcome(&outcome);
            resolve(&service, &mut nav, user_ctx.as_ref());
            print_state(nav.state());
            print_history(&nav);
        }
        cli::Commands::Replay { from, user, steps } => {
            let user_ctx = service.user_context(user.as_deref())?;
            let mut nav = service.navigator_at(&from);
            resolve(&service, &mut nav, user_ctx.as_ref());
            for step in &steps {
                run_step(&mut nav, step)?;
                resolve(&service, &mut nav, user_ctx.as_ref());
                println!("{step:<28} -> {} [{}]", nav.state().page(), nav.history().location().href());
            }
            print_state(nav.state());
            print_history(&nav);
        }
        cli::Commands::Routes => {
            let mut table = header_table(&["Name", "Path", "Target"]);
            for r in route::routes() {
                let target = match r.target {
                    RouteTarget::Page(page) if page.as_ref() == r.name => format!("page {page}"),
                    RouteTarget::Page(page) => format!("page {page} (alias)"),
                    RouteTarget::Modal(modal) => format!("modal {modal}"),
                };
                table.add_row(vec![Cell::new(r.name), Cell::new(r.path), Cell::new(target)]);
            }
            println!("{table}");
        }
        cli::Commands::Plan { action } => match action {
            cli::PlanCommands::Add { id, name, active_variant } => {
                service.add_plan(&id, &name, active_variant.as_deref())?;
                println!("Saved workout plan '{}'.", id.trim());
            }
            cli::PlanCommands::List => {
                let plans = service.list_plans()?;
                if plans.is_empty() {
                    println!("No workout plans stored.");
                } else {
                    let mut table = header_table(&["ID", "Name", "Active variant", "Updated"]);
                    for record in plans {
                        table.add_row(vec![
                            Cell::new(&record.plan.id),
                            Cell::new(&record.plan.name),
                            Cell::new(or_dash(record.plan.active_variant_id.as_deref())),
                            Cell::new(record.updated_at.format("%Y-%m-%d %H:%M").to_string()),
                        ]);
                    }
                    println!("{table}");
                }
            }
            cli::PlanCommands::Delete { id } => match service.delete_plan(&id) {
                Ok(()) => println!("Deleted workout plan '{id}' and its assignments."),
                Err(e) => bail!("Error deleting plan '{}': {}", id, e),
            },
        },
        cli::Commands::Assign { user, plan, variant } => {
            let assignment = service.assign(&user, &plan, variant.as_deref())?;
            println!("Assigned {} to '{}'.", assignment.to_token(), user);
        }
        cli::Commands::Unassign { user, plan } => {
            if service.unassign(&user, &plan)? {
                println!("Removed plan '{plan}' from '{user}'.");
            } else {
                println!("'{user}' had no assignment for plan '{plan}'.");
            }
        }
        cli::Commands::Assignments { user } => {
            let assignments = service.list_assignments(&user)?;
            if assignments.is_empty() {
                println!("No plans assigned to '{user}'.");
            } else {
                let mut table = header_table(&["Plan", "Variant", "Token"]);
                for a in assignments {
                    table.add_row(vec![
                        Cell::new(&a.plan_id),
                        Cell::new(or_dash(a.variant_id.as_deref())),
                        Cell::new(a.to_token()),
                    ]);
                }
                println!("{table}");
            }
        }
        cli::Commands::Config => {
            println!("Config file: {}", service.get_config_path().display());
            let rendered = toml::to_string_pretty(&service.config).context("Failed to render config")?;
            println!("{rendered}");
        }
        cli::Commands::SetDefaultTab { tab } => {
            service.set_default_workouts_tab(&tab)?;
            println!("Workouts page now opens on tab '{}'.", tab.trim());
        }
        cli::Commands::SetLogLevel { level } => {
            service.set_log_level(&level)?;
            println!("Log filter set to '{}'.", level.trim());
        }
        cli::Commands::SetDefaultUser { user } => {
            service.config.default_user = user.filter(|u| !u.trim().is_empty());
            service.save_config()?;
            match &service.config.default_user {
                Some(u) => println!("Default user set to '{u}'."),
                None => println!("Default user cleared."),
            }
        }
        cli::Commands::DbPath => {
            println!("Database file is located at: {}", service.get_db_path().display());
        }
    }

    Ok(())
}

fn run_step(nav: &mut Navigator<MemoryHistory>, step: &str) -> Result<()> {
    match step {
        "back" => {
            nav.back();
        }
        "forward" => {
            nav.forward();
        }
        "logout" => {
            nav.redirect_after_logout();
        }
        _ => {
            if let Some(name) = step.strip_prefix("close:") {
                let modal = Modal::from_str(name).map_err(|_| anyhow::anyhow!("Unknown modal '{name}'"))?;
                nav.close_modal(modal);
            } else if let Some(tab) = step.strip_prefix("tab:") {
                nav.set_workouts_tab(tab);
            } else {
                let mut parts = step.splitn(3, ',');
                let target = parts.next().unwrap_or_default();
                if target.is_empty() {
                    bail!("Empty navigation step");
                }
                let plan = parts.next().filter(|s| !s.is_empty());
                let extra = parts.next().filter(|s| !s.is_empty());
                nav.navigate(target, plan, extra);
            }
        }
    }
    Ok(())
}

fn resolve(service: &AppService, nav: &mut Navigator<MemoryHistory>, user: Option<&UserContext>) {
    let data = service.data_service();
    nav.resolve_pending_variant(&data, user);
}

fn header_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Green)),
        );
    table
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn print_outcome(outcome: &NavOutcome) {
    let kind = match outcome.kind {
        NavKind::Page(page) => format!("page {page}"),
        NavKind::Modal(modal) => format!("modal {modal}"),
        NavKind::Unmapped => "unmapped target".to_string(),
    };
    let pushed = if outcome.pushed { "pushed" } else { "already current" };
    println!("Navigated to {kind}: {} ({pushed})", outcome.url);
}

fn print_state(state: &PageState) {
    let mut table = header_table(&["State", "Value"]);
    table.add_row(vec![Cell::new("Page"), Cell::new(state.page().to_string())]);
    table.add_row(vec![Cell::new("Selected plan"), Cell::new(or_dash(state.selected_plan_id()))]);
    table.add_row(vec![Cell::new("Workout link"), Cell::new(or_dash(state.workout_link_id()))]);
    table.add_row(vec![Cell::new("Active variant"), Cell::new(or_dash(state.active_variant_id()))]);
    table.add_row(vec![Cell::new("Workouts tab"), Cell::new(state.workouts_default_tab())]);
    let modals: Vec<String> = state.open_modals().iter().map(ToString::to_string).collect();
    table.add_row(vec![
        Cell::new("Open modals"),
        Cell::new(if modals.is_empty() { "-".to_string() } else { modals.join(", ") }),
    ]);
    let detail = match state.workout_detail_view() {
        DetailView::NotActive => None,
        DetailView::NotFound => Some("plan not found".to_string()),
        DetailView::Plan { plan_id, variant_id } => {
            Some(format!("{plan_id} / {}", variant_id.as_deref().unwrap_or("default variant")))
        }
    };
    if let Some(detail) = detail {
        table.add_row(vec![Cell::new("Detail view"), Cell::new(detail)]);
    }
    println!("{table}");
}

fn print_history(nav: &Navigator<MemoryHistory>) {
    let history = nav.history();
    println!("History ({} pushes):", history.push_count());
    for (i, entry) in history.entries().iter().enumerate() {
        let marker = if i == history.cursor() { ">" } else { " " };
        println!(" {marker} {}", entry.href());
    }
}
