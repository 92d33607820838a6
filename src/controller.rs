// src/controller.rs
use crate::history::{HistoryWriter, MemoryHistory};
use crate::parser;
use crate::popstate::PopstateListener;
use crate::route::{self, Modal, PageId, RouteTarget};
use crate::state::{PageState, Transition, DEFAULT_WORKOUTS_TAB};
use crate::variant::{self, ServiceError, UserContext, WorkoutDataService, WorkoutPlan};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Tab the workouts page opens on.
    pub default_workouts_tab: String,
    /// Skip pushing an entry identical to the one already shown.
    pub dedupe_history: bool,
    /// Rewrite the boot URL to its canonical form with `replaceState`.
    pub canonicalize_on_boot: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            default_workouts_tab: DEFAULT_WORKOUTS_TAB.to_string(),
            dedupe_history: true,
            canonicalize_on_boot: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavOptions<'a> {
    pub plan_id: Option<&'a str>,
    /// Link token for the workout card, explicit variant for the detail page.
    pub link_or_variant: Option<&'a str>,
    /// Keep the current workouts tab instead of resetting it.
    pub preserve_tab: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavKind {
    Page(PageId),
    Modal(Modal),
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavOutcome {
    pub kind: NavKind,
    pub url: String,
    /// `false` when the entry was already current and got deduplicated.
    pub pushed: bool,
}

/// An in-flight variant lookup. Results are only applied while the ticket's
/// generation is still the latest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTicket {
    generation: u64,
    plan_id: String,
    url_variant: Option<String>,
}

impl ResolutionTicket {
    #[must_use]
    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct Navigator<H: HistoryWriter> {
    state: PageState,
    history: H,
    popstate: PopstateListener,
    config: NavigatorConfig,
    generation: u64,
    resolution_pending: bool,
}

impl<H: HistoryWriter> Navigator<H> {
    /// Derives the initial state from the history's current location and
    /// starts listening for back/forward.
    pub fn boot(history: H, config: NavigatorConfig) -> Self {
        let mut nav = Self {
            state: PageState::new(&config.default_workouts_tab),
            history,
            popstate: PopstateListener::default(),
            config,
            generation: 0,
            resolution_pending: false,
        };
        let location = nav.history.location();
        let parsed = parser::parse(&location.pathname, &location.search);
        if let Some(transition) = nav.state.apply_location(&parsed, &nav.config.default_workouts_tab) {
            nav.after_transition(transition);
        }
        if nav.config.canonicalize_on_boot && parsed.fallback.is_some() {
            let url = nav.state.current_url();
            nav.history.replace(&url);
        }
        nav.popstate.attach();
        debug!(page = %nav.state.page(), href = %location.href(), "Navigator booted");
        nav
    }

    #[must_use]
    pub const fn state(&self) -> &PageState {
        &self.state
    }

    #[must_use]
    pub const fn history(&self) -> &H {
        &self.history
    }

    #[must_use]
    pub const fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Stops reacting to back/forward.
    pub fn teardown(&mut self) {
        self.popstate.detach();
    }

    /// Entry point for UI navigation. `target` is a page name, a page alias
    /// or a modal name.
    pub fn navigate(&mut self, target: &str, plan_id: Option<&str>, link_or_variant: Option<&str>) -> NavOutcome {
        self.navigate_with(target, NavOptions { plan_id, link_or_variant, preserve_tab: false })
    }

    pub fn navigate_with(&mut self, target: &str, opts: NavOptions<'_>) -> NavOutcome {
        let Some(entry) = route::lookup_name(target) else {
            warn!(nav_target = target, "Navigation to unmapped page, pushing home path");
            let url = route::canonical_path(PageId::Home).to_string();
            let pushed = self.push(&url);
            return NavOutcome { kind: NavKind::Unmapped, url, pushed };
        };

        let page = match entry.target {
            RouteTarget::Modal(modal) => {
                self.state.set_modal(modal, true);
                let url = entry.path.to_string();
                let pushed = self.push(&url);
                return NavOutcome { kind: NavKind::Modal(modal), url, pushed };
            }
            RouteTarget::Page(page) => page,
        };

        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
        let mut variant_changed = false;
        let transition = match page {
            PageId::WorkoutCard => {
                let Some(link) = non_empty(opts.link_or_variant) else {
                    // `/workout-card` without a token parses to home, so go there instead.
                    warn!(nav_target = target, "Workout card navigation without a link token, going home");
                    return self.navigate_with(PageId::Home.as_ref(), NavOptions::default());
                };
                self.state.enter_workout_card(Some(link))
            }
            PageId::WorkoutDetail => {
                let transition = self.state.enter_workout_detail(non_empty(opts.plan_id));
                let variant = non_empty(opts.link_or_variant);
                variant_changed = self.state.active_variant_id() != variant.as_deref();
                self.state.set_active_variant_id(variant);
                transition
            }
            PageId::Workouts => {
                if !opts.preserve_tab {
                    let tab = self.config.default_workouts_tab.clone();
                    self.state.set_workouts_default_tab(&tab);
                }
                self.state.set_page(page)
            }
            _ => self.state.set_page(page),
        };
        self.after_transition(transition);
        if variant_changed && !transition.entered_detail() {
            // Same plan, different explicit variant: the old choice no longer applies.
            self.resolution_pending = true;
            self.generation += 1;
        }

        let url = route::path_url(
            entry.path,
            page,
            self.state.selected_plan_id(),
            self.state.workout_link_id(),
            self.state.active_variant_id(),
        );
        let pushed = self.push(&url);
        debug!(nav_target = target, %url, pushed, "Navigated");
        NavOutcome { kind: NavKind::Page(page), url, pushed }
    }

    /// Back/forward handler. Reads the location, never writes history.
    pub fn handle_popstate(&mut self) -> Option<Transition> {
        let transition = self
            .popstate
            .dispatch(&self.history, &mut self.state, &self.config.default_workouts_tab)
            .flatten()?;
        self.after_transition(transition);
        Some(transition)
    }

    /// Closes an overlay. When the address bar still shows the modal's
    /// path, the main page's URL is pushed back.
    pub fn close_modal(&mut self, modal: Modal) -> Option<String> {
        self.state.set_modal(modal, false);
        if self.history.location().pathname != route::modal_path(modal) {
            return None;
        }
        let url = self.state.current_url();
        self.push(&url);
        Some(url)
    }

    pub fn set_workouts_tab(&mut self, tab: &str) {
        self.state.set_workouts_default_tab(tab);
    }

    /// Sends the visitor home when the page they are on needs a session.
    pub fn redirect_after_logout(&mut self) -> Option<NavOutcome> {
        if !self.state.page().requires_session() {
            return None;
        }
        Some(self.navigate(PageId::Home.as_ref(), None, None))
    }

    #[must_use]
    pub const fn variant_resolution_pending(&self) -> bool {
        self.resolution_pending
    }

    /// Takes the pending resolution, if any. Starting a new one makes every
    /// older ticket stale.
    pub fn begin_variant_resolution(&mut self) -> Option<ResolutionTicket> {
        if !self.resolution_pending {
            return None;
        }
        self.resolution_pending = false;
        let plan_id = self.state.selected_plan_id().filter(|id| !id.is_empty())?.to_string();
        self.generation += 1;
        Some(ResolutionTicket {
            generation: self.generation,
            plan_id,
            url_variant: parser::variant_param(&self.history.location().search),
        })
    }

    /// Applies a finished plan fetch. Returns `false` when the ticket was
    /// superseded and the result was dropped.
    pub fn complete_variant_resolution(
        &mut self,
        ticket: &ResolutionTicket,
        fetched: Result<Option<WorkoutPlan>, ServiceError>,
        user: Option<&UserContext>,
    ) -> bool {
        let still_showing = self.state.page() == PageId::WorkoutDetail
            && self.state.selected_plan_id() == Some(ticket.plan_id.as_str());
        if ticket.generation != self.generation || !still_showing {
            debug!(plan_id = %ticket.plan_id, generation = ticket.generation, "Dropping stale variant resolution");
            return false;
        }
        let variant = match fetched {
            Ok(plan) => {
                variant::resolve_variant(ticket.url_variant.as_deref(), user, &ticket.plan_id, plan.as_ref())
            }
            Err(e) => {
                warn!(plan_id = %ticket.plan_id, error = %e, "Variant lookup failed");
                None
            }
        };
        self.state.set_active_variant_id(variant);
        true
    }

    /// Runs the pending resolution to completion against `service`.
    pub fn resolve_pending_variant<S: WorkoutDataService + ?Sized>(
        &mut self,
        service: &S,
        user: Option<&UserContext>,
    ) -> Option<String> {
        let ticket = self.begin_variant_resolution()?;
        let fetched = service.get_workout_plan_by_id(&ticket.plan_id);
        self.complete_variant_resolution(&ticket, fetched, user);
        self.state.active_variant_id().map(str::to_string)
    }

    fn after_transition(&mut self, transition: Transition) {
        if transition.left_detail() {
            self.state.set_active_variant_id(None);
            self.resolution_pending = false;
            self.generation += 1;
        } else if transition.entered_detail() {
            self.resolution_pending = true;
            self.generation += 1;
        }
    }

    fn push(&mut self, url: &str) -> bool {
        if self.config.dedupe_history && self.history.location().href() == url {
            return false;
        }
        self.history.push(url);
        true
    }
}

impl Navigator<MemoryHistory> {
    /// Simulates the browser back button.
    pub fn back(&mut self) -> Option<Transition> {
        if !self.history.back() {
            return None;
        }
        self.handle_popstate()
    }

    pub fn forward(&mut self) -> Option<Transition> {
        if !self.history.forward() {
            return None;
        }
        self.handle_popstate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::LocationSource;
    use crate::state::DetailView;
    use std::cell::Cell;

    struct FixedPlans {
        calls: Cell<usize>,
        fail: bool,
    }

    impl FixedPlans {
        fn new() -> Self {
            Self { calls: Cell::new(0), fail: false }
        }
    }

    impl WorkoutDataService for FixedPlans {
        fn get_workout_plan_by_id(&self, id: &str) -> Result<Option<WorkoutPlan>, ServiceError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ServiceError::Backend("offline".into()));
            }
            Ok(Some(WorkoutPlan { id: id.to_string(), name: id.to_uppercase(), active_variant_id: Some("B".into()) }))
        }
    }

    fn boot(href: &str) -> Navigator<MemoryHistory> {
        Navigator::boot(MemoryHistory::new(href), NavigatorConfig::default())
    }

    #[test]
    fn variant_override_navigation() {
        let mut nav = boot("/");
        let outcome = nav.navigate("workout-detail", Some("planX"), Some("variantY"));
        assert_eq!(outcome.url, "/workout-detail?id=planX&variant=variantY");
        assert_eq!(nav.state().page(), PageId::WorkoutDetail);
        assert_eq!(nav.state().selected_plan_id(), Some("planX"));
        assert_eq!(nav.state().active_variant_id(), Some("variantY"));
        assert_eq!(nav.history().location().href(), outcome.url);

        // resolution keeps the explicit choice since it is now in the URL
        let resolved = nav.resolve_pending_variant(&FixedPlans::new(), None);
        assert_eq!(resolved.as_deref(), Some("variantY"));
    }

    #[test]
    fn workout_card_navigation_pushes_token() {
        let mut nav = boot("/");
        let outcome = nav.navigate("workout-card", None, Some("abc 1"));
        assert_eq!(outcome.url, "/workout-card?workout=abc%201");
        assert_eq!(nav.state().workout_link_id(), Some("abc 1"));
    }

    #[test]
    fn workout_card_without_link_goes_home() {
        let mut nav = boot("/rankings");
        let outcome = nav.navigate("workout-card", None, None);
        assert_eq!(outcome.kind, NavKind::Page(PageId::Home));
        assert_eq!(outcome.url, "/");
        assert_eq!(nav.state().page(), PageId::Home);

        nav.navigate("rankings", None, None);
        nav.back();
        assert_eq!(nav.state().page(), PageId::Home);
    }

    #[test]
    fn renavigating_same_plan_drops_the_override() {
        let mut nav = boot("/");
        nav.navigate("workout-detail", Some("p1"), Some("v"));
        nav.resolve_pending_variant(&FixedPlans::new(), None);

        let outcome = nav.navigate("workout-detail", Some("p1"), None);
        assert_eq!(outcome.url, "/workout-detail?id=p1");
        assert_eq!(outcome.url, nav.state().current_url());
        assert_eq!(nav.state().active_variant_id(), None);
        assert!(nav.variant_resolution_pending());

        // falls back to the plan's active variant
        let resolved = nav.resolve_pending_variant(&FixedPlans::new(), None);
        assert_eq!(resolved.as_deref(), Some("B"));

        let outcome = nav.navigate("workout-detail", Some("p1"), Some("w"));
        assert_eq!(outcome.url, "/workout-detail?id=p1&variant=w");
        assert_eq!(outcome.url, nav.state().current_url());
        assert!(nav.variant_resolution_pending());
    }

    #[test]
    fn modal_navigation_keeps_the_page() {
        let mut nav = boot("/rankings");
        let outcome = nav.navigate("privacy-policy", None, None);
        assert_eq!(outcome.kind, NavKind::Modal(Modal::PrivacyPolicy));
        assert_eq!(outcome.url, "/privacy");
        assert_eq!(nav.state().page(), PageId::Rankings);
        assert!(nav.state().modals().privacy_policy);

        nav.navigate("login", None, None);
        assert!(nav.state().modals().privacy_policy);
        assert_eq!(nav.state().page(), PageId::Login);
    }

    #[test]
    fn closing_a_modal_restores_the_page_url() {
        let mut nav = boot("/rankings");
        nav.navigate("terms", None, None);
        assert_eq!(nav.close_modal(Modal::Terms).as_deref(), Some("/rankings"));
        assert!(!nav.state().is_modal_open(Modal::Terms));
        assert_eq!(nav.close_modal(Modal::Terms), None);
    }

    #[test]
    fn unmapped_target_pushes_root_and_keeps_page() {
        let mut nav = boot("/rankings");
        let outcome = nav.navigate("admin-dashboard", None, None);
        assert_eq!(outcome.kind, NavKind::Unmapped);
        assert_eq!(outcome.url, "/");
        assert!(outcome.pushed);
        assert_eq!(nav.state().page(), PageId::Rankings);
    }

    #[test]
    fn workouts_tab_reset_unless_preserved() {
        let mut nav = boot("/");
        nav.set_workouts_tab("history");
        nav.navigate_with("workouts", NavOptions { preserve_tab: true, ..NavOptions::default() });
        assert_eq!(nav.state().workouts_default_tab(), "history");
        nav.navigate("home", None, None);
        nav.navigate("athlete-home", None, None);
        assert_eq!(nav.state().workouts_default_tab(), "current");
        assert_eq!(nav.history().location().pathname, "/athlete-home");
    }

    #[test]
    fn popstate_never_pushes() {
        let mut nav = boot("/");
        nav.navigate("rankings", None, None);
        nav.navigate("workout-detail", Some("p1"), None);
        let pushes = nav.history().push_count();

        let transition = nav.back().expect("moved back");
        assert_eq!(transition.to, PageId::Rankings);
        nav.forward();
        assert_eq!(nav.state().page(), PageId::WorkoutDetail);
        assert_eq!(nav.history().push_count(), pushes);
    }

    #[test]
    fn empty_plan_id_renders_not_found() {
        let mut nav = boot("/");
        nav.navigate("workout-detail", None, None);
        assert_eq!(nav.state().workout_detail_view(), DetailView::NotFound);
        let service = FixedPlans::new();
        assert_eq!(nav.resolve_pending_variant(&service, None), None);
        assert_eq!(service.calls.get(), 0);
    }

    #[test]
    fn stale_resolution_is_dropped() {
        let mut nav = boot("/workout-detail?id=p1");
        let first = nav.begin_variant_resolution().expect("pending after boot");
        nav.navigate("workout-detail", Some("p2"), None);
        let second = nav.begin_variant_resolution().expect("new plan");

        let plan = |id: &str, v: &str| {
            Ok(Some(WorkoutPlan { id: id.into(), name: String::new(), active_variant_id: Some(v.into()) }))
        };
        assert!(nav.complete_variant_resolution(&second, plan("p2", "fresh"), None));
        assert!(!nav.complete_variant_resolution(&first, plan("p1", "stale"), None));
        assert_eq!(nav.state().active_variant_id(), Some("fresh"));
    }

    #[test]
    fn leaving_detail_invalidates_in_flight_ticket() {
        let mut nav = boot("/workout-detail?id=p1");
        let ticket = nav.begin_variant_resolution().expect("pending");
        nav.navigate("rankings", None, None);
        nav.navigate("workout-detail", Some("p1"), None);
        assert!(!nav.complete_variant_resolution(&ticket, Ok(None), None));
        assert_eq!(nav.state().active_variant_id(), None);
        assert!(nav.variant_resolution_pending());
    }

    #[test]
    fn failed_fetch_leaves_variant_unset() {
        let mut nav = boot("/workout-detail?id=p1");
        let service = FixedPlans { fail: true, ..FixedPlans::new() };
        assert_eq!(nav.resolve_pending_variant(&service, None), None);
        assert_eq!(
            nav.state().workout_detail_view(),
            DetailView::Plan { plan_id: "p1".into(), variant_id: None }
        );
    }

    #[test]
    fn deduplicates_identical_pushes() {
        let mut nav = boot("/login");
        assert!(!nav.navigate("login", None, None).pushed);
        assert_eq!(nav.history().push_count(), 0);
    }

    #[test]
    fn logout_redirects_only_from_protected_pages() {
        let mut nav = boot("/rankings");
        assert!(nav.redirect_after_logout().is_none());
        nav.navigate("coach-dashboard", None, None);
        let outcome = nav.redirect_after_logout().expect("redirected");
        assert_eq!(outcome.url, "/");
        assert_eq!(nav.state().page(), PageId::Home);
    }

    #[test]
    fn canonicalize_on_boot_rewrites_unknown_paths() {
        let config = NavigatorConfig { canonicalize_on_boot: true, ..NavigatorConfig::default() };
        let nav = Navigator::boot(MemoryHistory::new("/nonexistent"), config);
        assert_eq!(nav.history().location().href(), "/");
        assert_eq!(nav.history().push_count(), 0);
    }

    #[test]
    fn teardown_stops_popstate_handling() {
        let mut nav = boot("/");
        nav.navigate("rankings", None, None);
        nav.teardown();
        assert!(nav.back().is_none());
        assert_eq!(nav.state().page(), PageId::Rankings);
    }
}
