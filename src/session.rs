//! Single-owner state for one interactive user.
//!
//! [`Session`] is only ever changed through [`Session::apply`] (user commands)
//! and [`Session::complete`] (finished fetches). Commands never perform I/O
//! against OMDb themselves; they return [`Effect`]s which the runtime turns
//! into fetch tasks. Every effect carries a fresh [`CancelToken`] and request
//! id, and a completion is only applied when both still match the request the
//! session is waiting for.

use crate::cancel::CancelToken;
use crate::models::{MovieDetail, SearchResultItem, WatchedMovie};
use crate::omdb::{search_error_message, FetchError, SearchPage};
use crate::pagination::{PageView, Pagination};
use crate::stats::{SummaryDisplay, WatchedSummary};
use crate::watched::{AddOutcome, WatchedStore};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_RATING: u8 = 10;
pub const APP_TITLE: &str = "usePopcorn";

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetQuery(String),
    /// Enter in the search box: clear the query and start over.
    ClearQuery,
    NextPage,
    PreviousPage,
    /// Selecting the currently selected id deselects it.
    Select(String),
    Close,
    Rate(u8),
    AddWatched,
    DeleteWatched(String),
}

#[derive(Debug, Clone)]
pub enum Effect {
    Search {
        request: RequestId,
        query: String,
        page: u32,
        token: CancelToken,
    },
    Detail {
        request: RequestId,
        id: String,
        token: CancelToken,
    },
}

#[derive(Debug)]
pub enum Completion {
    Search {
        request: RequestId,
        result: Result<SearchPage, FetchError>,
    },
    Detail {
        request: RequestId,
        result: Result<MovieDetail, FetchError>,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("rating must be between 0 and 10, got {0}")]
    RatingOutOfRange(u16),
    #[error("no movie is selected")]
    NoSelection,
    #[error("movie details are still loading")]
    DetailNotLoaded,
    #[error("movie is already on the watch list")]
    AlreadyWatched,
    #[error("rate the movie before adding it")]
    NotRated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailPhase {
    Idle,
    Loading,
    Loaded,
    /// The user has rated this movie before but cleared the stars again.
    RatingInProgress,
    /// A nonzero rating is set and the movie can be added.
    Rated,
    AlreadyWatched,
}

#[derive(Debug)]
struct InFlight {
    request: RequestId,
    token: CancelToken,
}

impl InFlight {
    fn accepts(&self, request: RequestId) -> bool {
        self.request == request && !self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct SearchState {
    movies: Vec<SearchResultItem>,
    is_loading: bool,
    error: Option<String>,
    in_flight: Option<InFlight>,
}

#[derive(Debug)]
struct Selection {
    id: String,
    phase: DetailPhase,
    detail: Option<MovieDetail>,
    user_rating: u8,
    rating_revisions: u32,
    in_flight: Option<InFlight>,
}

pub struct Session {
    query: String,
    pagination: Pagination,
    search: SearchState,
    selection: Option<Selection>,
    detail_error: Option<String>,
    watched: WatchedStore,
    summary: WatchedSummary,
    next_request: RequestId,
}

impl Session {
    pub fn new(watched: WatchedStore) -> Self {
        let summary = WatchedSummary::compute(watched.list());
        Self {
            query: String::new(),
            pagination: Pagination::default(),
            search: SearchState::default(),
            selection: None,
            detail_error: None,
            watched,
            summary,
            next_request: 1,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn movies(&self) -> &[SearchResultItem] {
        &self.search.movies
    }

    pub fn search_error(&self) -> Option<&str> {
        self.search.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.search.is_loading
    }

    pub fn phase(&self) -> DetailPhase {
        self.selection
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(DetailPhase::Idle)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.id.as_str())
    }

    pub fn watched(&self) -> &WatchedStore {
        &self.watched
    }

    pub fn summary(&self) -> &WatchedSummary {
        &self.summary
    }

    pub fn apply(&mut self, command: Command) -> Result<Vec<Effect>, CommandError> {
        debug!(command = ?command, "applying command");
        match command {
            Command::SetQuery(query) => {
                self.query = query;
                self.pagination.reset();
                Ok(self.start_search().into_iter().collect())
            }
            Command::ClearQuery => {
                self.query.clear();
                self.pagination.reset();
                Ok(self.start_search().into_iter().collect())
            }
            Command::NextPage => {
                self.pagination.next();
                Ok(self.start_search().into_iter().collect())
            }
            Command::PreviousPage => {
                self.pagination.previous();
                Ok(self.start_search().into_iter().collect())
            }
            Command::Select(id) => Ok(self.select(id).into_iter().collect()),
            Command::Close => {
                self.close_selection();
                Ok(Vec::new())
            }
            Command::Rate(rating) => self.rate(rating).map(|_| Vec::new()),
            Command::AddWatched => self.add_selected().map(|_| Vec::new()),
            Command::DeleteWatched(id) => {
                self.delete_watched(&id);
                Ok(Vec::new())
            }
        }
    }

    /// Applies a finished fetch. Returns `false` when it belonged to a
    /// superseded or cancelled request and was dropped.
    pub fn complete(&mut self, completion: Completion) -> bool {
        match completion {
            Completion::Search { request, result } => self.complete_search(request, result),
            Completion::Detail { request, result } => self.complete_detail(request, result),
        }
    }

    /// Cancels every in-flight request.
    pub fn shutdown(&mut self) {
        if let Some(prev) = self.search.in_flight.take() {
            prev.token.cancel();
        }
        if let Some(prev) = self.selection.as_mut().and_then(|s| s.in_flight.take()) {
            prev.token.cancel();
        }
    }

    fn next_request_id(&mut self) -> RequestId {
        let id = self.next_request;
        self.next_request += 1;
        id
    }

    fn start_search(&mut self) -> Option<Effect> {
        if let Some(prev) = self.search.in_flight.take() {
            debug!(request = prev.request, "cancelling superseded search");
            prev.token.cancel();
        }

        if self.query.chars().count() < MIN_QUERY_CHARS {
            self.search.movies.clear();
            self.search.error = None;
            self.search.is_loading = false;
            return None;
        }

        let request = self.next_request_id();
        let token = CancelToken::new();
        self.search.is_loading = true;
        self.search.error = None;
        self.search.in_flight = Some(InFlight {
            request,
            token: token.clone(),
        });
        let page = self.pagination.current_page();
        info!("Searching '{}' page {} (request {})", self.query, page, request);
        Some(Effect::Search {
            request,
            query: self.query.clone(),
            page,
            token,
        })
    }

    fn complete_search(
        &mut self,
        request: RequestId,
        result: Result<SearchPage, FetchError>,
    ) -> bool {
        let current = self
            .search
            .in_flight
            .as_ref()
            .map(|f| f.accepts(request))
            .unwrap_or(false);
        if !current {
            debug!(request, "dropping stale search result");
            return false;
        }
        self.search.in_flight = None;
        self.search.is_loading = false;

        match result {
            Ok(page) => {
                debug!(
                    request,
                    items = page.items.len(),
                    total = page.total_results,
                    "search completed"
                );
                self.search.movies = page.items;
                self.search.error = None;
                self.pagination.set_total_results(page.total_results);
                self.pagination.mark_fetch_complete();
            }
            Err(err) => match search_error_message(&err) {
                Some(message) => {
                    warn!("Search '{}' failed: {}", self.query, err);
                    self.search.movies.clear();
                    self.search.error = Some(message);
                    self.pagination.mark_fetch_complete();
                }
                None => debug!(request, "search cancelled"),
            },
        }
        true
    }

    fn select(&mut self, id: String) -> Option<Effect> {
        if self.selected_id() == Some(id.as_str()) {
            debug!(id = %id, "reselected current movie, deselecting");
            self.close_selection();
            return None;
        }
        self.close_selection();

        let request = self.next_request_id();
        let token = CancelToken::new();
        info!("Loading details for {} (request {})", id, request);
        self.selection = Some(Selection {
            id: id.clone(),
            phase: DetailPhase::Loading,
            detail: None,
            user_rating: 0,
            rating_revisions: 0,
            in_flight: Some(InFlight {
                request,
                token: token.clone(),
            }),
        });
        Some(Effect::Detail { request, id, token })
    }

    fn complete_detail(
        &mut self,
        request: RequestId,
        result: Result<MovieDetail, FetchError>,
    ) -> bool {
        let Some(selection) = self.selection.as_mut() else {
            debug!(request, "dropping detail result, nothing selected");
            return false;
        };
        let current = selection
            .in_flight
            .as_ref()
            .map(|f| f.accepts(request))
            .unwrap_or(false);
        if !current {
            debug!(request, "dropping stale detail result");
            return false;
        }
        selection.in_flight = None;

        match result {
            Ok(detail) => {
                selection.phase = if self.watched.contains(&selection.id) {
                    DetailPhase::AlreadyWatched
                } else {
                    DetailPhase::Loaded
                };
                debug!(id = %selection.id, phase = ?selection.phase, "detail loaded");
                selection.detail = Some(detail);
            }
            Err(FetchError::Cancelled) => {
                debug!(request, "detail fetch cancelled");
                self.selection = None;
            }
            Err(err) => {
                warn!("Failed to load details for {}: {}", selection.id, err);
                self.detail_error = Some(err.to_string());
                self.selection = None;
            }
        }
        true
    }

    fn close_selection(&mut self) {
        self.detail_error = None;
        if let Some(mut selection) = self.selection.take() {
            if let Some(prev) = selection.in_flight.take() {
                debug!(request = prev.request, "cancelling detail fetch");
                prev.token.cancel();
            }
        }
    }

    fn rate(&mut self, rating: u8) -> Result<(), CommandError> {
        if rating > MAX_RATING {
            return Err(CommandError::RatingOutOfRange(rating.into()));
        }
        let selection = self.selection.as_mut().ok_or(CommandError::NoSelection)?;
        match selection.phase {
            DetailPhase::Loaded | DetailPhase::RatingInProgress | DetailPhase::Rated => {}
            DetailPhase::AlreadyWatched => return Err(CommandError::AlreadyWatched),
            DetailPhase::Idle | DetailPhase::Loading => return Err(CommandError::DetailNotLoaded),
        }

        if rating != 0 && rating != selection.user_rating {
            selection.rating_revisions += 1;
        }
        selection.user_rating = rating;
        selection.phase = match (rating, selection.rating_revisions) {
            (0, 0) => DetailPhase::Loaded,
            (0, _) => DetailPhase::RatingInProgress,
            _ => DetailPhase::Rated,
        };
        debug!(
            id = %selection.id,
            rating,
            revisions = selection.rating_revisions,
            "rating adjusted"
        );
        Ok(())
    }

    fn add_selected(&mut self) -> Result<(), CommandError> {
        let selection = self.selection.as_mut().ok_or(CommandError::NoSelection)?;
        match selection.phase {
            DetailPhase::Rated => {}
            DetailPhase::Loaded | DetailPhase::RatingInProgress => {
                return Err(CommandError::NotRated)
            }
            DetailPhase::AlreadyWatched => return Err(CommandError::AlreadyWatched),
            DetailPhase::Idle | DetailPhase::Loading => return Err(CommandError::DetailNotLoaded),
        }
        let detail = selection
            .detail
            .as_ref()
            .ok_or(CommandError::DetailNotLoaded)?;
        let movie = WatchedMovie::from_detail(
            &selection.id,
            detail,
            selection.user_rating,
            selection.rating_revisions,
        );
        if self.watched.add(movie) == AddOutcome::AlreadyPresent {
            selection.phase = DetailPhase::AlreadyWatched;
            return Err(CommandError::AlreadyWatched);
        }
        self.summary = WatchedSummary::compute(self.watched.list());
        self.close_selection();
        Ok(())
    }

    fn delete_watched(&mut self, id: &str) {
        if self.watched.remove(id) == 0 {
            return;
        }
        self.summary = WatchedSummary::compute(self.watched.list());
        if let Some(selection) = self.selection.as_mut() {
            if selection.id == id && selection.phase == DetailPhase::AlreadyWatched {
                selection.phase = DetailPhase::Loaded;
            }
        }
    }

    pub fn window_title(&self) -> String {
        match self
            .selection
            .as_ref()
            .and_then(|s| s.detail.as_ref())
            .filter(|d| !d.title.is_empty())
        {
            Some(detail) => format!("Movie: {}", detail.title),
            None => APP_TITLE.to_string(),
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            title: self.window_title(),
            query: self.query.clone(),
            search: SearchView {
                found: self.search.movies.len(),
                movies: self.search.movies.clone(),
                is_loading: self.search.is_loading,
                error: self.search.error.clone(),
            },
            pagination: self.pagination.view(),
            selection: self.selection.as_ref().map(|s| SelectionView {
                id: s.id.clone(),
                phase: s.phase,
                detail: s.detail.clone(),
                user_rating: s.user_rating,
                rating_revisions: s.rating_revisions,
                watched_rating: self.watched.find(&s.id).map(|m| m.user_rating),
                can_add: s.phase == DetailPhase::Rated,
            }),
            detail_error: self.detail_error.clone(),
            watched: self.watched.list().to_vec(),
            summary: self.summary.display(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub title: String,
    pub query: String,
    pub search: SearchView,
    pub pagination: PageView,
    pub selection: Option<SelectionView>,
    pub detail_error: Option<String>,
    pub watched: Vec<WatchedMovie>,
    pub summary: SummaryDisplay,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchView {
    pub movies: Vec<SearchResultItem>,
    pub found: usize,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionView {
    pub id: String,
    pub phase: DetailPhase,
    pub detail: Option<MovieDetail>,
    pub user_rating: u8,
    pub rating_revisions: u32,
    /// Rating stored on the watch list, shown instead of the rating control.
    pub watched_rating: Option<u8>,
    pub can_add: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omdb::NOT_FOUND_MESSAGE;
    use tempfile::TempDir;

    fn session() -> (Session, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = WatchedStore::open(dir.path().join("watched.json"));
        (Session::new(store), dir)
    }

    fn item(id: &str) -> SearchResultItem {
        SearchResultItem {
            id: id.to_string(),
            title: format!("Title {id}"),
            year: "2001".to_string(),
            poster_url: None,
        }
    }

    fn detail(id: &str) -> MovieDetail {
        MovieDetail {
            id: id.to_string(),
            title: format!("Title {id}"),
            year: "2001".to_string(),
            poster_url: None,
            runtime: "100 min".to_string(),
            runtime_minutes: Some(100.0),
            external_rating: Some(8.0),
            plot: Some("Plot".to_string()),
            release_date: None,
            actors: None,
            director: None,
            genre: None,
        }
    }

    fn search_request(effects: &[Effect]) -> (RequestId, u32, CancelToken) {
        match effects {
            [Effect::Search {
                request,
                page,
                token,
                ..
            }] => (*request, *page, token.clone()),
            other => panic!("expected one search effect, got {other:?}"),
        }
    }

    fn detail_request(effects: &[Effect]) -> RequestId {
        match effects {
            [Effect::Detail { request, .. }] => *request,
            other => panic!("expected one detail effect, got {other:?}"),
        }
    }

    fn loaded(session: &mut Session, id: &str) {
        let effects = session.apply(Command::Select(id.to_string())).expect("select");
        let request = detail_request(&effects);
        assert!(session.complete(Completion::Detail {
            request,
            result: Ok(detail(id)),
        }));
    }

    #[test]
    fn short_query_makes_no_request_and_clears_results() {
        let (mut s, _dir) = session();
        let effects = s.apply(Command::SetQuery("ab".to_string())).expect("query");
        let (request, _, _) = search_request(&effects);
        s.complete(Completion::Search {
            request,
            result: Ok(SearchPage {
                items: vec![item("tt1")],
                total_results: 1,
            }),
        });
        assert_eq!(s.movies().len(), 1);

        let effects = s.apply(Command::SetQuery("a".to_string())).expect("query");
        assert!(effects.is_empty());
        assert!(s.movies().is_empty());
        assert_eq!(s.search_error(), None);
        assert!(!s.is_loading());
    }

    #[test]
    fn late_response_for_previous_page_is_ignored() {
        let (mut s, _dir) = session();
        let (page1, p, token1) =
            search_request(&s.apply(Command::SetQuery("matrix".to_string())).expect("query"));
        assert_eq!(p, 1);
        let (page2, p, _) = search_request(&s.apply(Command::NextPage).expect("next"));
        assert_eq!(p, 2);
        assert!(token1.is_cancelled());

        assert!(s.complete(Completion::Search {
            request: page2,
            result: Ok(SearchPage {
                items: vec![item("page2")],
                total_results: 25,
            }),
        }));
        assert!(!s.complete(Completion::Search {
            request: page1,
            result: Ok(SearchPage {
                items: vec![item("page1")],
                total_results: 25,
            }),
        }));
        assert_eq!(s.movies()[0].id, "page2");
        assert_eq!(s.pagination().current_page(), 2);
    }

    #[test]
    fn query_change_resets_page() {
        let (mut s, _dir) = session();
        s.apply(Command::SetQuery("alien".to_string())).expect("query");
        s.apply(Command::NextPage).expect("next");
        s.apply(Command::NextPage).expect("next");
        assert_eq!(s.pagination().current_page(), 3);
        let (_, page, _) =
            search_request(&s.apply(Command::SetQuery("aliens".to_string())).expect("query"));
        assert_eq!(page, 1);
        assert_eq!(s.query(), "aliens");
    }

    #[test]
    fn not_found_sets_message_and_completes_fetch() {
        let (mut s, _dir) = session();
        let (request, _, _) =
            search_request(&s.apply(Command::SetQuery("zzzzqx".to_string())).expect("query"));
        s.complete(Completion::Search {
            request,
            result: Err(FetchError::NotFound { reason: None }),
        });
        assert_eq!(s.search_error(), Some(NOT_FOUND_MESSAGE));
        assert!(s.movies().is_empty());
        assert!(!s.is_loading());
    }

    #[test]
    fn cancellation_error_is_not_surfaced() {
        let (mut s, _dir) = session();
        let (request, _, _) =
            search_request(&s.apply(Command::SetQuery("heat".to_string())).expect("query"));
        s.complete(Completion::Search {
            request,
            result: Err(FetchError::Cancelled),
        });
        assert_eq!(s.search_error(), None);
    }

    #[test]
    fn transport_failure_is_surfaced() {
        let (mut s, _dir) = session();
        let (request, _, _) =
            search_request(&s.apply(Command::SetQuery("heat".to_string())).expect("query"));
        s.complete(Completion::Search {
            request,
            result: Err(FetchError::Transport("connection reset".to_string())),
        });
        assert_eq!(s.search_error(), Some("connection reset"));
        assert!(!s.is_loading());
    }

    #[test]
    fn reselecting_the_same_id_deselects() {
        let (mut s, _dir) = session();
        loaded(&mut s, "tt1");
        assert_eq!(s.phase(), DetailPhase::Loaded);
        let effects = s.apply(Command::Select("tt1".to_string())).expect("select");
        assert!(effects.is_empty());
        assert_eq!(s.phase(), DetailPhase::Idle);
        assert_eq!(s.selected_id(), None);
    }

    #[test]
    fn switching_selection_drops_old_detail() {
        let (mut s, _dir) = session();
        let first = detail_request(&s.apply(Command::Select("tt1".to_string())).expect("select"));
        let second = detail_request(&s.apply(Command::Select("tt2".to_string())).expect("select"));
        assert!(!s.complete(Completion::Detail {
            request: first,
            result: Ok(detail("tt1")),
        }));
        assert_eq!(s.phase(), DetailPhase::Loading);
        assert!(s.complete(Completion::Detail {
            request: second,
            result: Ok(detail("tt2")),
        }));
        assert_eq!(s.selected_id(), Some("tt2"));
        assert_eq!(s.window_title(), "Movie: Title tt2");
    }

    #[test]
    fn rating_then_add_commits_revisions_and_returns_to_idle() {
        let (mut s, _dir) = session();
        loaded(&mut s, "tt1");
        s.apply(Command::Rate(6)).expect("rate");
        assert_eq!(s.phase(), DetailPhase::Rated);
        s.apply(Command::Rate(6)).expect("rate");
        s.apply(Command::Rate(9)).expect("rate");
        s.apply(Command::AddWatched).expect("add");

        assert_eq!(s.phase(), DetailPhase::Idle);
        assert_eq!(s.window_title(), APP_TITLE);
        let stored = s.watched().find("tt1").expect("stored");
        assert_eq!(stored.user_rating, 9);
        assert_eq!(stored.rating_revisions, 2);
        assert_eq!(s.summary().count, 1);
        assert_eq!(s.summary().avg_external_rating, 8.0);
    }

    #[test]
    fn rating_phases_follow_the_star_control() {
        let (mut s, _dir) = session();
        let request = detail_request(&s.apply(Command::Select("tt1".to_string())).expect("select"));
        let mut phases = vec![s.phase()];
        s.complete(Completion::Detail {
            request,
            result: Ok(detail("tt1")),
        });
        phases.push(s.phase());
        s.apply(Command::Rate(5)).expect("rate");
        phases.push(s.phase());
        assert!(s.view().selection.expect("selection").can_add);
        s.apply(Command::Rate(0)).expect("clear");
        phases.push(s.phase());
        assert!(matches!(
            s.apply(Command::AddWatched),
            Err(CommandError::NotRated)
        ));
        s.apply(Command::Rate(8)).expect("rate");
        phases.push(s.phase());
        s.apply(Command::AddWatched).expect("add");
        phases.push(s.phase());

        assert_eq!(
            phases,
            vec![
                DetailPhase::Loading,
                DetailPhase::Loaded,
                DetailPhase::Rated,
                DetailPhase::RatingInProgress,
                DetailPhase::Rated,
                DetailPhase::Idle,
            ]
        );
        assert_eq!(s.watched().find("tt1").map(|m| m.rating_revisions), Some(2));
    }

    #[test]
    fn snapshot_is_stored_under_the_selected_id() {
        let (mut s, _dir) = session();
        let request = detail_request(&s.apply(Command::Select("tt42".to_string())).expect("select"));
        s.complete(Completion::Detail {
            request,
            result: Ok(detail("tt0042")),
        });
        s.apply(Command::Rate(7)).expect("rate");
        s.apply(Command::AddWatched).expect("add");
        assert!(s.watched().contains("tt42"));
        assert!(!s.watched().contains("tt0042"));

        let request = detail_request(&s.apply(Command::Select("tt42".to_string())).expect("select"));
        s.complete(Completion::Detail {
            request,
            result: Ok(detail("tt0042")),
        });
        assert_eq!(s.phase(), DetailPhase::AlreadyWatched);
        assert!(matches!(
            s.apply(Command::AddWatched),
            Err(CommandError::AlreadyWatched)
        ));
    }

    #[test]
    fn add_requires_a_rating() {
        let (mut s, _dir) = session();
        loaded(&mut s, "tt1");
        assert!(matches!(
            s.apply(Command::AddWatched),
            Err(CommandError::NotRated)
        ));
        assert!(matches!(
            s.apply(Command::Rate(11)),
            Err(CommandError::RatingOutOfRange(11))
        ));
    }

    #[test]
    fn watched_movie_reopens_as_already_watched() {
        let (mut s, _dir) = session();
        loaded(&mut s, "tt1");
        s.apply(Command::Rate(7)).expect("rate");
        s.apply(Command::AddWatched).expect("add");

        loaded(&mut s, "tt1");
        assert_eq!(s.phase(), DetailPhase::AlreadyWatched);
        let view = s.view();
        let selection = view.selection.expect("selection");
        assert_eq!(selection.watched_rating, Some(7));
        assert!(!selection.can_add);
        assert!(matches!(
            s.apply(Command::Rate(3)),
            Err(CommandError::AlreadyWatched)
        ));
        assert!(matches!(
            s.apply(Command::AddWatched),
            Err(CommandError::AlreadyWatched)
        ));
        assert_eq!(s.watched().list().len(), 1);
    }

    #[test]
    fn delete_restores_previous_list_and_summary() {
        let (mut s, _dir) = session();
        let before = s.watched().list().to_vec();
        loaded(&mut s, "tt1");
        s.apply(Command::Rate(5)).expect("rate");
        s.apply(Command::AddWatched).expect("add");
        s.apply(Command::DeleteWatched("tt1".to_string()))
            .expect("delete");
        assert_eq!(s.watched().list(), before.as_slice());
        assert_eq!(s.summary(), &WatchedSummary::default());
    }

    #[test]
    fn detail_failure_returns_to_idle_with_message() {
        let (mut s, _dir) = session();
        let request = detail_request(&s.apply(Command::Select("tt404".to_string())).expect("select"));
        s.complete(Completion::Detail {
            request,
            result: Err(FetchError::NotFound { reason: None }),
        });
        assert_eq!(s.phase(), DetailPhase::Idle);
        assert_eq!(s.view().detail_error.as_deref(), Some("Movie not found"));
    }

    #[test]
    fn shutdown_cancels_in_flight_requests() {
        let (mut s, _dir) = session();
        let (_, _, search_token) =
            search_request(&s.apply(Command::SetQuery("dune".to_string())).expect("query"));
        let detail_token =
            match s.apply(Command::Select("tt1".to_string())).expect("select").as_slice() {
                [Effect::Detail { token, .. }] => token.clone(),
                other => panic!("expected detail effect, got {other:?}"),
            };
        drop(s);
        assert!(search_token.is_cancelled());
        assert!(detail_token.is_cancelled());
    }
}
