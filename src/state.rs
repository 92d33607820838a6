// src/state.rs
use crate::parser::{LocationTarget, ParsedLocation};
use crate::route::{self, Modal, PageId};
use serde::Serialize;

pub const DEFAULT_WORKOUTS_TAB: &str = "current";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModalFlags {
    pub privacy: bool,
    pub terms: bool,
    pub cookie_policy: bool,
    pub privacy_policy: bool,
    pub cookie_settings: bool,
}

impl ModalFlags {
    #[must_use]
    pub const fn is_open(&self, modal: Modal) -> bool {
        match modal {
            Modal::Privacy => self.privacy,
            Modal::Terms => self.terms,
            Modal::CookiePolicy => self.cookie_policy,
            Modal::PrivacyPolicy => self.privacy_policy,
            Modal::CookieSettings => self.cookie_settings,
        }
    }

    pub(crate) fn set(&mut self, modal: Modal, open: bool) {
        let flag = match modal {
            Modal::Privacy => &mut self.privacy,
            Modal::Terms => &mut self.terms,
            Modal::CookiePolicy => &mut self.cookie_policy,
            Modal::PrivacyPolicy => &mut self.privacy_policy,
            Modal::CookieSettings => &mut self.cookie_settings,
        };
        *flag = open;
    }
}

/// What the workout detail page has to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DetailView {
    NotActive,
    /// On the detail page without a plan id.
    NotFound,
    Plan { plan_id: String, variant_id: Option<String> },
}

/// Summary of a single state change, used to decide whether the variant of
/// the shown plan has to be resolved again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PageId,
    pub to: PageId,
    pub plan_changed: bool,
}

impl Transition {
    #[must_use]
    pub fn entered_detail(&self) -> bool {
        self.to == PageId::WorkoutDetail && (self.from != PageId::WorkoutDetail || self.plan_changed)
    }

    #[must_use]
    pub fn left_detail(&self) -> bool {
        self.from == PageId::WorkoutDetail && self.to != PageId::WorkoutDetail
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageState {
    page: PageId,
    selected_plan_id: Option<String>,
    workout_link_id: Option<String>,
    active_variant_id: Option<String>,
    workouts_default_tab: String,
    modals: ModalFlags,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_WORKOUTS_TAB)
    }
}

impl PageState {
    #[must_use]
    pub fn new(default_tab: &str) -> Self {
        Self {
            page: PageId::Home,
            selected_plan_id: None,
            workout_link_id: None,
            active_variant_id: None,
            workouts_default_tab: default_tab.to_string(),
            modals: ModalFlags::default(),
        }
    }

    #[must_use]
    pub const fn page(&self) -> PageId {
        self.page
    }

    #[must_use]
    pub fn selected_plan_id(&self) -> Option<&str> {
        self.selected_plan_id.as_deref()
    }

    #[must_use]
    pub fn workout_link_id(&self) -> Option<&str> {
        self.workout_link_id.as_deref()
    }

    #[must_use]
    pub fn active_variant_id(&self) -> Option<&str> {
        self.active_variant_id.as_deref()
    }

    #[must_use]
    pub fn workouts_default_tab(&self) -> &str {
        &self.workouts_default_tab
    }

    #[must_use]
    pub const fn modals(&self) -> &ModalFlags {
        &self.modals
    }

    #[must_use]
    pub const fn is_modal_open(&self, modal: Modal) -> bool {
        self.modals.is_open(modal)
    }

    #[must_use]
    pub fn open_modals(&self) -> Vec<Modal> {
        use strum::IntoEnumIterator;
        Modal::iter().filter(|m| self.modals.is_open(*m)).collect()
    }

    #[must_use]
    pub fn workout_detail_view(&self) -> DetailView {
        if self.page != PageId::WorkoutDetail {
            return DetailView::NotActive;
        }
        match self.selected_plan_id.as_deref().filter(|id| !id.is_empty()) {
            Some(plan_id) => DetailView::Plan {
                plan_id: plan_id.to_string(),
                variant_id: self.active_variant_id.clone(),
            },
            None => DetailView::NotFound,
        }
    }

    /// Canonical URL of the main page, ignoring open modals.
    #[must_use]
    pub fn current_url(&self) -> String {
        route::page_url(
            self.page,
            self.selected_plan_id.as_deref(),
            self.workout_link_id.as_deref(),
            self.active_variant_id.as_deref(),
        )
    }

    pub(crate) fn set_page(&mut self, page: PageId) -> Transition {
        let from = self.page;
        self.page = page;
        Transition { from, to: page, plan_changed: false }
    }

    /// Enters the detail page with exactly the plan id supplied, so a bare
    /// entry never shows the plan of an earlier visit.
    pub(crate) fn enter_workout_detail(&mut self, plan_id: Option<String>) -> Transition {
        let plan_changed = self.selected_plan_id != plan_id;
        self.selected_plan_id = plan_id;
        let transition = Transition { plan_changed, ..self.set_page(PageId::WorkoutDetail) };
        if transition.entered_detail() {
            self.active_variant_id = None;
        }
        transition
    }

    pub(crate) fn enter_workout_card(&mut self, link_id: Option<String>) -> Transition {
        self.workout_link_id = link_id;
        self.set_page(PageId::WorkoutCard)
    }

    pub(crate) fn set_active_variant_id(&mut self, variant_id: Option<String>) {
        self.active_variant_id = variant_id;
    }

    pub(crate) fn set_workouts_default_tab(&mut self, tab: &str) {
        self.workouts_default_tab = tab.to_string();
    }

    pub(crate) fn set_modal(&mut self, modal: Modal, open: bool) {
        self.modals.set(modal, open);
    }

    /// Applies a parsed location. Modal locations only raise their flag;
    /// page locations never touch the modal flags. Returns `None` for a
    /// modal-only location.
    pub(crate) fn apply_location(&mut self, parsed: &ParsedLocation, default_tab: &str) -> Option<Transition> {
        let page = match parsed.target {
            LocationTarget::ModalOnly(modal) => {
                self.set_modal(modal, true);
                return None;
            }
            LocationTarget::Page(page) => page,
        };
        let transition = match page {
            PageId::WorkoutDetail => {
                let transition = self.enter_workout_detail(parsed.params.plan_id.clone());
                if let Some(variant) = &parsed.params.variant_id {
                    self.active_variant_id = Some(variant.clone());
                }
                transition
            }
            PageId::WorkoutCard => self.enter_workout_card(parsed.params.workout_link_id.clone()),
            PageId::Workouts => {
                self.set_workouts_default_tab(default_tab);
                self.set_page(page)
            }
            _ => self.set_page(page),
        };
        if transition.left_detail() {
            self.active_variant_id = None;
        }
        Some(transition)
    }
}
