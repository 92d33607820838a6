// src/route.rs
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Every named view the site can show in its main area.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PageId {
    Home,
    Login,
    AthleteAuth,
    AthleteRegister,
    AthleteProfile,
    CoachDashboard,
    Workouts,
    WorkoutManager,
    AthleteStatistics,
    AthleteManager,
    Rankings,
    MembershipCards,
    EmailTest,
    WorkoutCard,
    WorkoutDetail,
}

impl PageId {
    /// Pages that only make sense with a signed-in athlete or coach.
    #[must_use]
    pub const fn requires_session(self) -> bool {
        matches!(
            self,
            Self::Workouts
                | Self::AthleteProfile
                | Self::CoachDashboard
                | Self::WorkoutManager
                | Self::AthleteStatistics
                | Self::AthleteManager
                | Self::MembershipCards
                | Self::EmailTest
        )
    }
}

/// Overlays that get their own URL but leave the main page in place.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Modal {
    Privacy,
    Terms,
    CookiePolicy,
    PrivacyPolicy,
    CookieSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Page(PageId),
    Modal(Modal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Name accepted by `Navigator::navigate`.
    pub name: &'static str,
    pub path: &'static str,
    pub target: RouteTarget,
}

const fn page(name: &'static str, path: &'static str, id: PageId) -> Route {
    Route { name, path, target: RouteTarget::Page(id) }
}

const fn modal(name: &'static str, path: &'static str, m: Modal) -> Route {
    Route { name, path, target: RouteTarget::Modal(m) }
}

// Lookups take the first matching row, so canonical rows come before aliases.
static ROUTES: &[Route] = &[
    page("home", "/", PageId::Home),
    page("login", "/login", PageId::Login),
    page("athlete-auth", "/athlete-auth", PageId::AthleteAuth),
    page("athlete-register", "/athlete-register", PageId::AthleteRegister),
    page("athlete-profile", "/profile", PageId::AthleteProfile),
    page("coach-dashboard", "/coach-dashboard", PageId::CoachDashboard),
    page("coach-home", "/coach-home", PageId::Home),
    page("workouts", "/workouts", PageId::Workouts),
    page("athlete-home", "/athlete-home", PageId::Workouts),
    page("workout-manager", "/workout-manager", PageId::WorkoutManager),
    page("athlete-statistics", "/athlete-statistics", PageId::AthleteStatistics),
    page("athlete-manager", "/athlete-manager", PageId::AthleteManager),
    page("rankings", "/rankings", PageId::Rankings),
    page("membership-cards", "/membership-cards", PageId::MembershipCards),
    page("email-test", "/email-test", PageId::EmailTest),
    page("workout-card", "/workout-card", PageId::WorkoutCard),
    page("workout-detail", "/workout-detail", PageId::WorkoutDetail),
    modal("privacy", "/privacy", Modal::Privacy),
    modal("privacy-policy", "/privacy", Modal::PrivacyPolicy),
    modal("terms", "/terms", Modal::Terms),
    modal("cookie-policy", "/cookie-policy", Modal::CookiePolicy),
    modal("cookie-settings", "/cookie-settings", Modal::CookieSettings),
];

pub const WORKOUT_LINK_PARAM: &str = "workout";
pub const PLAN_ID_PARAM: &str = "id";
pub const VARIANT_PARAM: &str = "variant";

#[must_use]
pub fn routes() -> &'static [Route] {
    ROUTES
}

#[must_use]
pub fn lookup_name(name: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|r| r.name == name)
}

#[must_use]
pub fn lookup_path(path: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|r| r.path == path)
}

/// Path of the first row that targets `id`.
#[must_use]
pub fn canonical_path(id: PageId) -> &'static str {
    ROUTES
        .iter()
        .find(|r| r.target == RouteTarget::Page(id))
        .map_or("/", |r| r.path)
}

#[must_use]
pub fn modal_path(m: Modal) -> &'static str {
    ROUTES
        .iter()
        .find(|r| r.target == RouteTarget::Modal(m))
        .map_or("/", |r| r.path)
}

/// Builds the full URL for a page, including the query parameters the
/// deep-linkable pages carry. Ids are percent-encoded.
#[must_use]
pub fn page_url(
    id: PageId,
    plan_id: Option<&str>,
    workout_link_id: Option<&str>,
    variant_id: Option<&str>,
) -> String {
    path_url(canonical_path(id), id, plan_id, workout_link_id, variant_id)
}

pub(crate) fn path_url(
    path: &str,
    id: PageId,
    plan_id: Option<&str>,
    workout_link_id: Option<&str>,
    variant_id: Option<&str>,
) -> String {
    fn non_empty(v: Option<&str>) -> Option<&str> {
        v.filter(|s| !s.is_empty())
    }
    match id {
        PageId::WorkoutCard => match non_empty(workout_link_id) {
            Some(link) => format!("{path}?{WORKOUT_LINK_PARAM}={}", urlencoding::encode(link)),
            None => path.to_string(),
        },
        PageId::WorkoutDetail => {
            let mut url = path.to_string();
            if let Some(plan) = non_empty(plan_id) {
                url.push_str(&format!("?{PLAN_ID_PARAM}={}", urlencoding::encode(plan)));
                if let Some(variant) = non_empty(variant_id) {
                    url.push_str(&format!("&{VARIANT_PARAM}={}", urlencoding::encode(variant)));
                }
            }
            url
        }
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn every_page_has_a_route() {
        for id in PageId::iter() {
            let path = canonical_path(id);
            assert_eq!(lookup_path(path).map(|r| r.target), Some(RouteTarget::Page(id)));
        }
    }

    #[test]
    fn aliases_resolve_to_their_page_but_not_canonically() {
        assert_eq!(lookup_name("coach-home").map(|r| r.target), Some(RouteTarget::Page(PageId::Home)));
        assert_eq!(lookup_name("athlete-home").map(|r| r.target), Some(RouteTarget::Page(PageId::Workouts)));
        assert_eq!(canonical_path(PageId::Home), "/");
        assert_eq!(canonical_path(PageId::Workouts), "/workouts");
        assert_eq!(canonical_path(PageId::AthleteProfile), "/profile");
    }

    #[test]
    fn privacy_policy_shares_the_privacy_path() {
        assert_eq!(modal_path(Modal::PrivacyPolicy), "/privacy");
        assert_eq!(lookup_path("/privacy").map(|r| r.target), Some(RouteTarget::Modal(Modal::Privacy)));
    }

    #[test]
    fn page_ids_use_kebab_case_names() {
        assert_eq!(PageId::WorkoutDetail.to_string(), "workout-detail");
        assert_eq!(PageId::from_str("membership-cards").ok(), Some(PageId::MembershipCards));
        assert_eq!(Modal::CookieSettings.as_ref(), "cookie-settings");
    }

    #[test]
    fn deep_link_urls_encode_their_ids() {
        assert_eq!(
            page_url(PageId::WorkoutDetail, Some("plan X"), None, Some("a&b")),
            "/workout-detail?id=plan%20X&variant=a%26b"
        );
        assert_eq!(page_url(PageId::WorkoutCard, None, Some("abc123"), None), "/workout-card?workout=abc123");
        assert_eq!(page_url(PageId::WorkoutDetail, None, None, Some("v")), "/workout-detail");
        assert_eq!(page_url(PageId::Rankings, Some("ignored"), None, None), "/rankings");
    }

    #[test]
    fn empty_ids_are_left_out_of_urls() {
        assert_eq!(page_url(PageId::WorkoutCard, None, Some(""), None), "/workout-card");
        assert_eq!(page_url(PageId::WorkoutDetail, Some(""), None, Some("v")), "/workout-detail");
        assert_eq!(page_url(PageId::WorkoutDetail, Some("p"), None, Some("")), "/workout-detail?id=p");
    }
}
