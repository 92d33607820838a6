// src/lib.rs
//! Navigation core for the KW8 gym site: keeps the current page, the
//! browser history and deep-link query parameters in step with each other.

// --- Declare modules ---
mod config;
pub mod controller;
#[cfg(not(target_arch = "wasm32"))]
pub mod db;
pub mod history;
pub mod parser;
pub mod popstate;
pub mod route;
pub mod state;
pub mod variant;

#[cfg(target_arch = "wasm32")]
pub mod browser;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, save as save_config_util, Config,
    Error as ConfigError,
};
pub use controller::{NavKind, NavOptions, NavOutcome, Navigator, NavigatorConfig, ResolutionTicket};
pub use history::{HistoryWriter, Location, LocationSource, MemoryHistory};
pub use parser::{parse, parse_href, Fallback, LocationTarget, ParsedLocation, RouteParams};
pub use route::{Modal, PageId, Route, RouteTarget};
pub use state::{DetailView, ModalFlags, PageState, Transition};
pub use variant::{resolve_variant, PlanAssignment, ServiceError, UserContext, WorkoutDataService, WorkoutPlan};

#[cfg(not(target_arch = "wasm32"))]
pub use db::{get_db_path as get_db_path_util, Error as DbError, PlanRecord, SqliteWorkoutData};
#[cfg(not(target_arch = "wasm32"))]
pub use service::AppService;

#[cfg(not(target_arch = "wasm32"))]
mod service {
    use crate::controller::Navigator;
    use crate::history::MemoryHistory;
    use crate::variant::{PlanAssignment, UserContext, WorkoutPlan};
    use crate::{config, db, Config, ConfigError, DbError, PlanRecord, SqliteWorkoutData};
    use anyhow::{bail, Context, Result};
    use rusqlite::Connection;
    use std::path::{Path, PathBuf};
    use tracing::info;

    pub struct AppService {
        pub config: Config,
        pub conn: Connection,
        pub db_path: PathBuf,
        pub config_path: PathBuf,
    }

    impl AppService {
        /// Initializes the application service.
        /// # Errors
        /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
        pub fn initialize() -> Result<Self> {
            let config_path = config::get_config_path().context("Failed to determine configuration file path")?;
            let config =
                config::load(&config_path).context(format!("Failed to load config from {config_path:?}"))?;

            let db_path = db::get_db_path().context("Failed to determine database path")?;
            let conn =
                db::open_db(&db_path).with_context(|| format!("Failed to open database at {db_path:?}"))?;

            db::init_db(&conn).context("Failed to initialize database schema")?;

            Ok(Self { config, conn, db_path, config_path })
        }

        pub fn get_config_path(&self) -> &Path {
            &self.config_path
        }

        pub fn get_db_path(&self) -> &Path {
            &self.db_path
        }

        pub fn save_config(&self) -> Result<(), ConfigError> {
            config::save(&self.config_path, &self.config)
        }

        pub fn set_default_workouts_tab(&mut self, tab: &str) -> Result<()> {
            self.config.set_default_workouts_tab(tab)?;
            self.save_config()?;
            Ok(())
        }

        pub fn set_log_level(&mut self, level: &str) -> Result<()> {
            self.config.set_log_level(level)?;
            self.save_config()?;
            Ok(())
        }

        pub fn data_service(&self) -> SqliteWorkoutData<'_> {
            SqliteWorkoutData::new(&self.conn)
        }

        /// Boots a navigator whose history starts at `href`.
        pub fn navigator_at(&self, href: &str) -> Navigator<MemoryHistory> {
            Navigator::boot(MemoryHistory::new(href), self.config.navigation.clone())
        }

        /// The athlete context for `user_id`, falling back to the configured
        /// default user. `None` when neither is known.
        pub fn user_context(&self, user_id: Option<&str>) -> Result<Option<UserContext>> {
            let Some(user_id) = user_id.or(self.config.default_user.as_deref()) else {
                return Ok(None);
            };
            let workout_plans = db::list_assignments(&self.conn, user_id)
                .with_context(|| format!("Failed to load plan assignments for user '{user_id}'"))?;
            Ok(Some(UserContext { user_id: Some(user_id.to_string()), workout_plans }))
        }

        pub fn add_plan(&self, id: &str, name: &str, active_variant: Option<&str>) -> Result<(), DbError> {
            let plan = WorkoutPlan {
                id: id.to_string(),
                name: name.to_string(),
                active_variant_id: active_variant.map(str::to_string),
            };
            db::upsert_plan(&self.conn, &plan)?;
            info!(plan_id = id, "Workout plan saved");
            Ok(())
        }

        pub fn list_plans(&self) -> Result<Vec<PlanRecord>, DbError> {
            db::list_plans(&self.conn)
        }

        pub fn delete_plan(&self, id: &str) -> Result<(), DbError> {
            db::delete_plan(&self.conn, id)?;
            info!(plan_id = id, "Workout plan deleted");
            Ok(())
        }

        /// Assigns a plan from either a plan id plus optional variant or a
        /// stored `"<plan>|variant:<id>"` token.
        pub fn assign(&self, user_id: &str, plan_or_token: &str, variant: Option<&str>) -> Result<PlanAssignment> {
            let mut assignment: PlanAssignment = plan_or_token.parse()?;
            if let Some(variant) = variant.filter(|v| !v.is_empty()) {
                if assignment.variant_id.is_some() {
                    bail!("Variant given twice: in the token and as an option");
                }
                assignment.variant_id = Some(variant.to_string());
            }
            db::assign_plan(&self.conn, user_id, &assignment)?;
            info!(user_id, plan_id = %assignment.plan_id, "Plan assigned");
            Ok(assignment)
        }

        pub fn unassign(&self, user_id: &str, plan_id: &str) -> Result<bool, DbError> {
            db::unassign_plan(&self.conn, user_id, plan_id)
        }

        pub fn list_assignments(&self, user_id: &str) -> Result<Vec<PlanAssignment>, DbError> {
            db::list_assignments(&self.conn, user_id)
        }
    }
}
