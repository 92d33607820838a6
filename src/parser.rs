// src/parser.rs
use crate::route::{self, Modal, PageId, RouteTarget, PLAN_ID_PARAM, VARIANT_PARAM, WORKOUT_LINK_PARAM};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocationTarget {
    Page(PageId),
    /// Open the overlay and leave the current page where it is.
    ModalOnly(Modal),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteParams {
    pub plan_id: Option<String>,
    pub workout_link_id: Option<String>,
    pub variant_id: Option<String>,
}

/// Why a location was sent to the home page instead of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Fallback {
    UnknownPath,
    MalformedQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedLocation {
    pub target: LocationTarget,
    pub params: RouteParams,
    pub fallback: Option<Fallback>,
}

impl ParsedLocation {
    fn page(id: PageId) -> Self {
        Self { target: LocationTarget::Page(id), params: RouteParams::default(), fallback: None }
    }

    fn home_fallback(reason: Fallback) -> Self {
        Self { fallback: Some(reason), ..Self::page(PageId::Home) }
    }
}

#[derive(Debug, Clone)]
struct MalformedQuery(String);

/// Query pairs in order of appearance. Values are decoded up front but a
/// decode failure only matters for keys the router actually reads.
struct Query(Vec<(String, Result<String, MalformedQuery>)>);

impl Query {
    fn parse(search: &str) -> Self {
        let raw = search.strip_prefix('?').unwrap_or(search);
        let pairs = raw
            .split('&')
            .filter(|p| !p.is_empty())
            .filter_map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                let key = decode_component(key).ok().filter(|k| !k.is_empty())?;
                Some((key, decode_component(value)))
            })
            .collect();
        Self(pairs)
    }

    /// First non-empty value for `key`. An undecodable value for `key`
    /// ahead of it makes the whole lookup malformed.
    fn get(&self, key: &str) -> Result<Option<&str>, MalformedQuery> {
        for (k, v) in &self.0 {
            if k != key {
                continue;
            }
            match v {
                Ok(v) if v.is_empty() => {}
                Ok(v) => return Ok(Some(v.as_str())),
                Err(e) => return Err(e.clone()),
            }
        }
        Ok(None)
    }
}

fn decode_component(raw: &str) -> Result<String, MalformedQuery> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| MalformedQuery(format!("{raw:?}: {e}")))
}

fn malformed(pathname: &str, search: &str, MalformedQuery(detail): MalformedQuery) -> ParsedLocation {
    warn!(pathname, search, %detail, "Malformed query string, falling back to home");
    ParsedLocation::home_fallback(Fallback::MalformedQuery)
}

/// Reads only the `variant` query value, if one is present and non-empty.
#[must_use]
pub fn variant_param(search: &str) -> Option<String> {
    Query::parse(search).get(VARIANT_PARAM).ok().flatten().map(str::to_string)
}

/// Maps a URL onto a page (or a modal overlay). Never fails: anything it
/// cannot place lands on the home page and is logged.
#[must_use]
pub fn parse(pathname: &str, search: &str) -> ParsedLocation {
    let query = Query::parse(search);

    if pathname == route::canonical_path(PageId::WorkoutCard) {
        match query.get(WORKOUT_LINK_PARAM) {
            Ok(Some(link)) => {
                let mut parsed = ParsedLocation::page(PageId::WorkoutCard);
                parsed.params.workout_link_id = Some(link.to_string());
                return parsed;
            }
            Ok(None) => {
                warn!(pathname, "Workout card link without a workout token, falling back to home");
                return ParsedLocation::home_fallback(Fallback::UnknownPath);
            }
            Err(e) => return malformed(pathname, search, e),
        }
    }

    if pathname == route::canonical_path(PageId::WorkoutDetail) {
        let (plan_id, variant_id) = match (query.get(PLAN_ID_PARAM), query.get(VARIANT_PARAM)) {
            (Ok(plan), Ok(variant)) => (plan, variant),
            (Err(e), _) | (_, Err(e)) => return malformed(pathname, search, e),
        };
        let mut parsed = ParsedLocation::page(PageId::WorkoutDetail);
        parsed.params.plan_id = plan_id.map(str::to_string);
        parsed.params.variant_id = variant_id.map(str::to_string);
        return parsed;
    }

    match route::lookup_path(pathname).map(|r| r.target) {
        Some(RouteTarget::Page(id)) => ParsedLocation::page(id),
        Some(RouteTarget::Modal(m)) => ParsedLocation {
            target: LocationTarget::ModalOnly(m),
            params: RouteParams::default(),
            fallback: None,
        },
        None => {
            warn!(pathname, "Unknown path, falling back to home");
            ParsedLocation::home_fallback(Fallback::UnknownPath)
        }
    }
}

/// Same as [`parse`] for a combined `path?query` string.
#[must_use]
pub fn parse_href(href: &str) -> ParsedLocation {
    let (pathname, search) = href.split_once('?').unwrap_or((href, ""));
    parse(pathname, search)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workout_card_deep_link() {
        let parsed = parse("/workout-card", "?workout=abc123");
        assert_eq!(parsed.target, LocationTarget::Page(PageId::WorkoutCard));
        assert_eq!(parsed.params.workout_link_id.as_deref(), Some("abc123"));
        assert_eq!(parsed.fallback, None);
    }

    #[test]
    fn workout_card_without_token_goes_home() {
        let parsed = parse("/workout-card", "");
        assert_eq!(parsed.target, LocationTarget::Page(PageId::Home));
        let parsed = parse("/workout-card", "?workout=");
        assert_eq!(parsed.target, LocationTarget::Page(PageId::Home));
    }

    #[test]
    fn workout_detail_reads_id_and_variant() {
        let parsed = parse_href("/workout-detail?id=plan%201&variant=v2");
        assert_eq!(parsed.target, LocationTarget::Page(PageId::WorkoutDetail));
        assert_eq!(parsed.params.plan_id.as_deref(), Some("plan 1"));
        assert_eq!(parsed.params.variant_id.as_deref(), Some("v2"));

        let bare = parse("/workout-detail", "");
        assert_eq!(bare.target, LocationTarget::Page(PageId::WorkoutDetail));
        assert_eq!(bare.params, RouteParams::default());
    }

    #[test]
    fn aliases_collapse_onto_their_page() {
        assert_eq!(parse("/coach-home", "").target, LocationTarget::Page(PageId::Home));
        assert_eq!(parse("/athlete-home", "").target, LocationTarget::Page(PageId::Workouts));
        assert_eq!(parse("/profile", "").target, LocationTarget::Page(PageId::AthleteProfile));
    }

    #[test]
    fn modal_paths_do_not_name_a_page() {
        assert_eq!(parse("/terms", "").target, LocationTarget::ModalOnly(Modal::Terms));
        assert_eq!(parse("/privacy", "").target, LocationTarget::ModalOnly(Modal::Privacy));
        assert_eq!(
            parse("/cookie-settings", "").target,
            LocationTarget::ModalOnly(Modal::CookieSettings)
        );
    }

    #[test]
    fn unknown_path_falls_back_with_reason() {
        let parsed = parse("/nonexistent", "");
        assert_eq!(parsed.target, LocationTarget::Page(PageId::Home));
        assert_eq!(parsed.fallback, Some(Fallback::UnknownPath));
    }

    #[test]
    fn undecodable_query_falls_back() {
        // %FF is not valid UTF-8 on its own
        let parsed = parse("/workout-detail", "?id=%FF");
        assert_eq!(parsed.target, LocationTarget::Page(PageId::Home));
        assert_eq!(parsed.fallback, Some(Fallback::MalformedQuery));
    }

    #[test]
    fn undecodable_params_outside_the_route_are_ignored() {
        let parsed = parse("/rankings", "?utm=%FF");
        assert_eq!(parsed.target, LocationTarget::Page(PageId::Rankings));
        assert_eq!(parsed.fallback, None);

        let parsed = parse("/workout-detail", "?ref=%FF&id=p1");
        assert_eq!(parsed.params.plan_id.as_deref(), Some("p1"));
        assert_eq!(parsed.fallback, None);

        let parsed = parse("/workout-detail", "?id=p1&variant=%FF");
        assert_eq!(parsed.fallback, Some(Fallback::MalformedQuery));
        let parsed = parse("/workout-card", "?workout=%C3");
        assert_eq!(parsed.fallback, Some(Fallback::MalformedQuery));
        assert_eq!(variant_param("?variant=%FF"), None);
    }

    #[test]
    fn query_plus_is_space_and_first_value_wins() {
        let parsed = parse("/workout-detail", "id=a+b&id=c");
        assert_eq!(parsed.params.plan_id.as_deref(), Some("a b"));
        assert_eq!(variant_param("?variant=&variant=x"), Some("x".to_string()));
        assert_eq!(variant_param(""), None);
    }
}
