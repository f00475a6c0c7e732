use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use eframe::egui;
use libby_core::{
    ApiClient, ApiError, AppConfig, AuthSession, Book, InteractionEvent, InteractionTracker,
    LibbyError, OnboardingWizard, RecommendationOutcome, Session, TrendingPeriod, User,
    WishlistEntry,
};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::widgets::{book_row, feedback_label, setup_dark_theme, RowAction, ERROR_COLOR};

const SEARCH_LIMIT: usize = 30;
const LIST_LIMIT: usize = 30;

pub struct AppInit {
    pub runtime: Arc<Runtime>,
    pub api: ApiClient,
    pub tracker: InteractionTracker,
    pub session: Session,
    pub config: AppConfig,
    pub ctx: egui::Context,
    pub update_tx: mpsc::UnboundedSender<UiEvent>,
    pub updates: mpsc::UnboundedReceiver<UiEvent>,
}

/// Results of background requests, applied in the frame loop in the order
/// they arrive.
pub enum UiEvent {
    Books {
        request: u64,
        result: Result<Vec<Book>, ApiError>,
    },
    Genres(Result<Vec<String>, ApiError>),
    Recommendations(RecommendationOutcome),
    BookDetail(Result<Book, ApiError>),
    RemoteWishlist {
        user_id: String,
        entries: Result<Vec<WishlistEntry>, ApiError>,
    },
    LoggedIn(Result<AuthSession, ApiError>),
    Account {
        action: AccountAction,
        result: Result<(), ApiError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    ChangePassword,
    DeleteAccount,
}

/// How a failed account request is reported.
#[derive(Debug)]
enum AccountFailure {
    /// Shown next to the form; the session stays as it is.
    Inline(String),
    Escalate(LibbyError),
}

impl AccountFailure {
    fn classify(action: AccountAction, err: ApiError) -> Self {
        match (action, err) {
            // The session token is fine; the server rejected the old password.
            (AccountAction::ChangePassword, ApiError::AuthRequired) => {
                AccountFailure::Inline("Current password is incorrect.".to_string())
            }
            (_, err) => AccountFailure::Escalate(err.into()),
        }
    }
}

/// Tracks the one book-list request whose result the list views accept.
#[derive(Debug, Default)]
struct ListRequests {
    latest: u64,
    pending: bool,
}

impl ListRequests {
    fn begin(&mut self) -> u64 {
        self.latest += 1;
        self.pending = true;
        self.latest
    }

    /// Forgets any request in flight.
    fn cancel(&mut self) {
        self.latest += 1;
        self.pending = false;
    }

    /// Whether the result of `request` should be shown.
    fn finish(&mut self, request: u64) -> bool {
        if request != self.latest {
            return false;
        }
        self.pending = false;
        true
    }

    fn is_loading(&self) -> bool {
        self.pending
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AppView {
    Discover,
    Search,
    Trending,
    Genres,
    BookDetail(Box<Book>),
    Wishlist,
    Onboarding,
    Profile,
    Settings,
    SignIn,
}

impl AppView {
    fn requires_user(&self) -> bool {
        matches!(
            self,
            AppView::Discover
                | AppView::Wishlist
                | AppView::Profile
                | AppView::Settings
        )
    }
}

pub struct LibbyApp {
    runtime: Arc<Runtime>,
    api: ApiClient,
    tracker: InteractionTracker,
    session: Session,
    config: AppConfig,
    ctx: egui::Context,
    update_tx: mpsc::UnboundedSender<UiEvent>,
    updates: mpsc::UnboundedReceiver<UiEvent>,
    current_view: AppView,
    books: Vec<Book>,
    list_error: Option<String>,
    list_requests: ListRequests,
    signing_in: bool,
    recommendations: Option<RecommendationOutcome>,
    search_query: String,
    trending_period: TrendingPeriod,
    genres: Vec<String>,
    selected_genre: Option<String>,
    wizard: OnboardingWizard,
    feedback: Option<(bool, String)>,
    // Sign in
    email: String,
    password: String,
    local_name: String,
    // Settings
    current_password: String,
    new_password: String,
    confirm_delete: bool,
}

impl LibbyApp {
    pub fn new(init: AppInit) -> Self {
        setup_dark_theme(&init.ctx);
        let wizard = OnboardingWizard::new(&init.config.onboarding);
        let mut app = Self {
            runtime: init.runtime,
            api: init.api,
            tracker: init.tracker,
            session: init.session,
            config: init.config,
            ctx: init.ctx,
            update_tx: init.update_tx,
            updates: init.updates,
            current_view: AppView::SignIn,
            books: Vec::new(),
            list_error: None,
            list_requests: ListRequests::default(),
            signing_in: false,
            recommendations: None,
            search_query: String::new(),
            trending_period: TrendingPeriod::default(),
            genres: Vec::new(),
            selected_genre: None,
            wizard,
            feedback: None,
            email: String::new(),
            password: String::new(),
            local_name: String::new(),
            current_password: String::new(),
            new_password: String::new(),
            confirm_delete: false,
        };
        if app.session.is_signed_in() {
            app.after_sign_in();
        }
        app
    }

    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.update_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let event = fut.await;
            if tx.send(event).is_err() {
                warn!("update receiver dropped");
            }
            ctx.request_repaint();
        });
    }

    fn track(&self, event: InteractionEvent) {
        let tracker = self.tracker.clone();
        // The response is not needed here.
        self.runtime.spawn(async move {
            tracker.track(&event).await;
        });
    }

    fn current_user_id(&self) -> Option<String> {
        self.session.user().map(|u| u.id)
    }

    fn navigate(&mut self, view: AppView) {
        if view.requires_user() && !self.session.is_signed_in() {
            self.feedback = Some((false, "Please sign in to continue.".to_string()));
            self.current_view = AppView::SignIn;
            return;
        }
        self.feedback = None;
        self.list_error = None;
        self.list_requests.cancel();
        match &view {
            AppView::Discover => self.load_recommendations(),
            AppView::Trending => self.load_trending(),
            AppView::Genres => {
                self.books.clear();
                self.selected_genre = None;
                self.load_genres();
            }
            AppView::Search => self.books.clear(),
            AppView::Wishlist => self.refresh_wishlist(),
            _ => {}
        }
        self.current_view = view;
    }

    fn handle_error(&mut self, err: LibbyError) {
        if err.requires_sign_in() {
            self.navigate(AppView::SignIn);
        }
        self.feedback = Some((false, err.to_string()));
    }

    fn after_sign_in(&mut self) {
        self.refresh_wishlist();
        if self.session.interests().is_empty() {
            self.wizard = OnboardingWizard::new(&self.config.onboarding);
            self.navigate(AppView::Onboarding);
        } else {
            self.navigate(AppView::Discover);
        }
    }

    fn load_recommendations(&mut self) {
        let Some(user_id) = self.current_user_id() else {
            return;
        };
        self.recommendations = None;
        let tracker = self.tracker.clone();
        let limit = self.config.recommendations.default_limit;
        self.spawn(async move {
            UiEvent::Recommendations(tracker.fetch_recommendations(&user_id, limit).await)
        });
    }

    fn load_trending(&mut self) {
        let request = self.list_requests.begin();
        let api = self.api.clone();
        let period = self.trending_period;
        self.spawn(async move {
            UiEvent::Books {
                request,
                result: api.trending(period, LIST_LIMIT).await,
            }
        });
    }

    fn load_genres(&mut self) {
        let api = self.api.clone();
        self.spawn(async move { UiEvent::Genres(api.genres().await) });
    }

    fn load_genre_books(&mut self, genre: String) {
        let request = self.list_requests.begin();
        self.selected_genre = Some(genre.clone());
        let api = self.api.clone();
        self.spawn(async move {
            UiEvent::Books {
                request,
                result: api.books_by_genre(&genre, LIST_LIMIT).await,
            }
        });
    }

    fn run_search(&mut self) {
        let query = self.search_query.trim().to_string();
        if query.is_empty() {
            self.list_error = Some("Type something to search.".to_string());
            return;
        }
        let request = self.list_requests.begin();
        self.list_error = None;
        let api = self.api.clone();
        self.spawn(async move {
            UiEvent::Books {
                request,
                result: api.search(&query, SEARCH_LIMIT).await,
            }
        });
    }

    fn refresh_wishlist(&mut self) {
        let Some(user_id) = self.current_user_id() else {
            return;
        };
        let api = self.api.clone();
        self.spawn(async move {
            let entries = api.wishlist(&user_id).await;
            UiEvent::RemoteWishlist { user_id, entries }
        });
    }

    fn open_book(&mut self, book: Book) {
        if let Some(user_id) = self.current_user_id() {
            self.track(InteractionEvent::click(&user_id, &book.id));
            self.track(InteractionEvent::view(&user_id, &book.id));
        }
        let api = self.api.clone();
        let id = book.id.clone();
        self.spawn(async move { UiEvent::BookDetail(api.book(&id).await) });
        self.feedback = None;
        self.current_view = AppView::BookDetail(Box::new(book));
    }

    fn toggle_wishlist(&mut self, book: Book) {
        let book_id = book.id.clone();
        let result = self
            .session
            .wishlist_mut()
            .and_then(|wishlist| wishlist.toggle(book).map_err(LibbyError::from));
        match result {
            Ok(true) => {
                if let Some(user_id) = self.current_user_id() {
                    self.track(InteractionEvent::wishlist_add(&user_id, &book_id));
                }
                self.feedback = Some((true, "Added to your wishlist.".to_string()));
            }
            Ok(false) => self.feedback = Some((true, "Removed from your wishlist.".to_string())),
            Err(err) => self.handle_error(err),
        }
    }

    fn apply_row_action(&mut self, action: RowAction) {
        match action {
            RowAction::Open(book) => self.open_book(book),
            RowAction::ToggleWishlist(book) => self.toggle_wishlist(book),
        }
    }

    fn saved_ids(&self) -> HashSet<String> {
        self.session
            .wishlist()
            .map(|w| w.entries().iter().map(|e| e.book.id.clone()).collect())
            .unwrap_or_default()
    }

    fn refresh_updates(&mut self) {
        while let Ok(evt) = self.updates.try_recv() {
            match evt {
                UiEvent::Books { request, result } => {
                    if !self.list_requests.finish(request) {
                        debug!(request, "dropping stale book list");
                        continue;
                    }
                    match result {
                        Ok(books) => {
                            self.list_error = None;
                            self.books = books;
                        }
                        Err(err) => {
                            warn!(error = %err, "failed to load books");
                            self.books.clear();
                            self.list_error = Some(list_error_message(&err));
                        }
                    }
                }
                UiEvent::Genres(result) => match result {
                    Ok(genres) => self.genres = genres,
                    Err(err) => {
                        warn!(error = %err, "failed to load genres");
                        self.list_error = Some(list_error_message(&err));
                    }
                },
                UiEvent::Recommendations(outcome) => {
                    self.recommendations = Some(outcome);
                }
                UiEvent::BookDetail(result) => match result {
                    Ok(book) => {
                        if let AppView::BookDetail(current) = &self.current_view {
                            if current.id == book.id {
                                self.current_view = AppView::BookDetail(Box::new(book));
                            }
                        }
                    }
                    Err(err) => debug!(error = %err, "keeping list data for book detail"),
                },
                UiEvent::RemoteWishlist { user_id, entries } => match entries {
                    Ok(entries) => {
                        if let Ok(wishlist) = self.session.wishlist_mut() {
                            wishlist.apply_remote(&user_id, entries);
                        }
                    }
                    Err(err) => debug!(error = %err, "remote wishlist unavailable, using cache"),
                },
                UiEvent::LoggedIn(result) => {
                    self.signing_in = false;
                    match result {
                        Ok(auth) => {
                            self.password.clear();
                            match self.session.sign_in(auth.user, Some(auth.token)) {
                                Ok(()) => self.after_sign_in(),
                                Err(err) => self.handle_error(err),
                            }
                        }
                        Err(ApiError::AuthRequired) => {
                            self.feedback = Some((false, "Invalid email or password.".to_string()))
                        }
                        Err(err) => self.feedback = Some((false, err.to_string())),
                    }
                }
                UiEvent::Account { action, result } => match (action, result) {
                    (AccountAction::ChangePassword, Ok(())) => {
                        self.current_password.clear();
                        self.new_password.clear();
                        self.feedback = Some((true, "Password updated.".to_string()));
                    }
                    (AccountAction::DeleteAccount, Ok(())) => {
                        self.sign_out();
                        self.feedback = Some((true, "Your account has been deleted.".to_string()));
                    }
                    (action, Err(err)) => match AccountFailure::classify(action, err) {
                        AccountFailure::Inline(message) => self.feedback = Some((false, message)),
                        AccountFailure::Escalate(err) => self.handle_error(err),
                    },
                },
            }
        }
    }

    fn sign_out(&mut self) {
        self.session.sign_out();
        self.books.clear();
        self.recommendations = None;
        self.wizard = OnboardingWizard::new(&self.config.onboarding);
        self.confirm_delete = false;
        self.current_view = AppView::SignIn;
    }

    fn draw_nav(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("nav").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.heading(egui::RichText::new("📚 Libby Bot").size(18.0));
                ui.separator();
                let entries = [
                    ("Discover", AppView::Discover),
                    ("Search", AppView::Search),
                    ("Trending", AppView::Trending),
                    ("Genres", AppView::Genres),
                    ("Wishlist", AppView::Wishlist),
                    ("Profile", AppView::Profile),
                    ("Settings", AppView::Settings),
                ];
                let mut target = None;
                for (label, view) in entries {
                    let selected = std::mem::discriminant(&self.current_view)
                        == std::mem::discriminant(&view);
                    if ui.selectable_label(selected, label).clicked() {
                        target = Some(view);
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match self.session.user() {
                        Some(user) => {
                            if ui.small_button("Sign out").clicked() {
                                self.sign_out();
                            }
                            ui.label(egui::RichText::new(user.display_name).weak());
                        }
                        None => {
                            if ui.small_button("Sign in").clicked() {
                                target = Some(AppView::SignIn);
                            }
                        }
                    }
                });
                if let Some(view) = target {
                    self.navigate(view);
                }
            });
        });
    }

    fn draw_book_list(&mut self, ui: &mut egui::Ui, books: &[Book]) {
        let saved = self.saved_ids();
        let mut action = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for book in books {
                if let Some(a) = book_row(ui, book, saved.contains(&book.id)) {
                    action = Some(a);
                }
                ui.add_space(6.0);
            }
        });
        if let Some(action) = action {
            self.apply_row_action(action);
        }
    }

    fn draw_loaded_books(&mut self, ui: &mut egui::Ui, empty_text: &str) {
        if self.list_requests.is_loading() {
            ui.spinner();
        } else if let Some(err) = &self.list_error {
            ui.label(egui::RichText::new(err.clone()).color(ERROR_COLOR));
        } else if self.books.is_empty() {
            ui.label(egui::RichText::new(empty_text).weak());
        } else {
            let books = self.books.clone();
            self.draw_book_list(ui, &books);
        }
    }

    fn draw_discover(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("🧭 Recommended for you").size(18.0));
            if ui.small_button("⟳").on_hover_text("Refresh").clicked() {
                self.load_recommendations();
            }
        });
        ui.separator();
        match self.recommendations.clone() {
            None => {
                ui.spinner();
            }
            Some(RecommendationOutcome::Failed { error }) => {
                ui.label(egui::RichText::new(error).color(ERROR_COLOR));
            }
            Some(RecommendationOutcome::Found { source, books }) => {
                ui.label(egui::RichText::new(format!("Based on {source} recommendations")).weak());
                self.draw_book_list(ui, &books);
            }
        }
    }

    fn draw_search(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.search_query)
                    .hint_text("Title, author or ISBN")
                    .desired_width(320.0),
            );
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("🔍 Search").clicked() || submitted {
                self.run_search();
            }
        });
        ui.separator();
        self.draw_loaded_books(ui, "No results yet.");
    }

    fn draw_trending(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("🔥 Trending").size(18.0));
            ui.separator();
            let before = self.trending_period;
            for period in TrendingPeriod::ALL {
                ui.selectable_value(&mut self.trending_period, period, period.as_str());
            }
            if before != self.trending_period {
                self.load_trending();
            }
        });
        ui.separator();
        self.draw_loaded_books(ui, "Nothing is trending for this period.");
    }

    fn draw_genres(&mut self, ui: &mut egui::Ui) {
        match self.selected_genre.clone() {
            None => {
                ui.heading(egui::RichText::new("Genres").size(18.0));
                ui.separator();
                if let Some(err) = &self.list_error {
                    ui.label(egui::RichText::new(err.clone()).color(ERROR_COLOR));
                }
                let mut picked = None;
                ui.horizontal_wrapped(|ui| {
                    for genre in &self.genres {
                        if ui.button(genre.as_str()).clicked() {
                            picked = Some(genre.clone());
                        }
                    }
                });
                if let Some(genre) = picked {
                    self.load_genre_books(genre);
                }
            }
            Some(genre) => {
                ui.horizontal(|ui| {
                    if ui.button("← Genres").clicked() {
                        self.selected_genre = None;
                        self.books.clear();
                        self.list_error = None;
                        self.list_requests.cancel();
                    }
                    ui.separator();
                    ui.heading(egui::RichText::new(genre).size(18.0));
                });
                ui.separator();
                self.draw_loaded_books(ui, "No books in this genre yet.");
            }
        }
    }

    fn draw_book_detail(&mut self, ui: &mut egui::Ui, book: Book) {
        ui.horizontal(|ui| {
            if ui.button("← Back").clicked() {
                self.navigate(AppView::Discover);
            }
            ui.separator();
            ui.heading(egui::RichText::new(&book.title).size(20.0));
        });
        ui.separator();
        ui.label(egui::RichText::new(book.display_author()).strong());

        egui::Grid::new("book_meta").num_columns(2).show(ui, |ui| {
            let rows = [
                ("Genre", book.genre.clone()),
                ("Published", book.publication_date.clone()),
                ("Pages", book.page_count.map(|p| p.to_string())),
                ("Language", book.language.clone()),
                ("ISBN", book.isbn.clone()),
                ("Rating", book.rating.map(|r| format!("{r:.1} / 5"))),
            ];
            for (label, value) in rows {
                if let Some(value) = value {
                    ui.label(egui::RichText::new(label).weak());
                    ui.label(value);
                    ui.end_row();
                }
            }
        });

        if let Some(description) = &book.description {
            ui.add_space(8.0);
            egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                ui.label(description.as_str());
            });
        }

        ui.add_space(8.0);
        let saved = self.saved_ids().contains(&book.id);
        ui.horizontal(|ui| {
            let heart = if saved { "♥ In wishlist" } else { "♡ Add to wishlist" };
            if ui.button(heart).clicked() {
                self.toggle_wishlist(book.clone());
            }
            ui.separator();
            ui.label("Rate:");
            for stars in 1..=5u8 {
                if ui.small_button("★".repeat(stars as usize)).clicked() {
                    match self.current_user_id() {
                        Some(user_id) => {
                            self.track(InteractionEvent::rating(&user_id, &book.id, stars));
                            self.feedback = Some((true, "Thanks for rating!".to_string()));
                        }
                        None => self.handle_error(LibbyError::SignInRequired),
                    }
                }
            }
        });
    }

    fn draw_wishlist(&mut self, ui: &mut egui::Ui) {
        let entries: Vec<WishlistEntry> = self
            .session
            .wishlist()
            .map(|w| w.entries().to_vec())
            .unwrap_or_default();
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new(format!("♥ Wishlist ({})", entries.len())).size(18.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!entries.is_empty(), egui::Button::new("🗑 Clear all"))
                    .clicked()
                {
                    let result = self
                        .session
                        .wishlist_mut()
                        .and_then(|w| w.clear().map_err(LibbyError::from));
                    if let Err(err) = result {
                        self.handle_error(err);
                    }
                }
            });
        });
        ui.separator();
        if entries.is_empty() {
            ui.label(egui::RichText::new("Your wishlist is empty. Save books from any list.").weak());
            return;
        }
        let mut open = None;
        let mut remove = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for entry in &entries {
                ui.group(|g| {
                    g.horizontal(|ui| {
                        ui.vertical(|ui| {
                            ui.label(egui::RichText::new(&entry.book.title).strong());
                            ui.label(
                                egui::RichText::new(format!(
                                    "{} · saved {}",
                                    entry.book.display_author(),
                                    entry.added_at.with_timezone(&Local).format("%Y-%m-%d")
                                ))
                                .weak()
                                .size(12.0),
                            );
                        });
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("Remove").clicked() {
                                remove = Some(entry.book.id.clone());
                            }
                            if ui.small_button("Details").clicked() {
                                open = Some(entry.book.clone());
                            }
                        });
                    });
                });
            }
        });
        if let Some(book_id) = remove {
            let result = self
                .session
                .wishlist_mut()
                .and_then(|w| w.remove(&book_id).map_err(LibbyError::from));
            if let Err(err) = result {
                self.handle_error(err);
            }
        }
        if let Some(book) = open {
            self.open_book(book);
        }
    }

    fn draw_onboarding(&mut self, ui: &mut egui::Ui) {
        ui.heading(
            egui::RichText::new(format!(
                "What do you like to read? ({}/{})",
                self.wizard.page() + 1,
                self.wizard.page_count()
            ))
            .size(18.0),
        );
        ui.label(
            egui::RichText::new(format!(
                "Pick at least {} interests. {} selected.",
                self.wizard.min_interests(),
                self.wizard.selection().len()
            ))
            .weak(),
        );
        ui.separator();

        let tags = self.wizard.tags().to_vec();
        ui.horizontal_wrapped(|ui| {
            for tag in &tags {
                let selected = self.wizard.is_selected(tag);
                if ui.selectable_label(selected, tag.as_str()).clicked() {
                    self.wizard.toggle(tag);
                }
            }
        });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.wizard.page() > 0, egui::Button::new("← Back"))
                .clicked()
            {
                self.wizard.back();
            }
            if self.wizard.is_last_page() {
                let finish = ui.add_enabled(
                    self.wizard.can_finish(),
                    egui::Button::new("Get Recommendations"),
                );
                if finish.clicked() {
                    match self.wizard.finish(&mut self.session) {
                        Ok(_) => self.navigate(AppView::Discover),
                        Err(err) => self.handle_error(err),
                    }
                }
            } else if ui.button("Next →").clicked() {
                self.wizard.next();
            }
        });
    }

    fn draw_profile(&mut self, ui: &mut egui::Ui) {
        let Some(user) = self.session.user() else {
            self.navigate(AppView::SignIn);
            return;
        };
        ui.heading(egui::RichText::new(&user.display_name).size(20.0));
        if let Some(email) = &user.email {
            ui.label(egui::RichText::new(email).weak());
        }
        ui.separator();
        ui.label(egui::RichText::new("Interests").strong());
        let interests = self.session.interests().clone();
        if interests.is_empty() {
            ui.label(egui::RichText::new("No interests selected yet.").weak());
        } else {
            ui.label(interests.iter().collect::<Vec<_>>().join(", "));
        }
        ui.horizontal(|ui| {
            if ui.button("Redo interests").clicked() {
                self.wizard = OnboardingWizard::new(&self.config.onboarding);
                self.navigate(AppView::Onboarding);
            }
            if ui.button("Edit current interests").clicked() {
                self.wizard =
                    OnboardingWizard::with_selection(&self.config.onboarding, interests.clone());
                self.navigate(AppView::Onboarding);
            }
        });
        ui.add_space(8.0);
        let saved = self.session.wishlist().map(|w| w.len()).unwrap_or(0);
        ui.label(format!("{saved} books in your wishlist"));
        ui.add_space(8.0);
        if ui.button("Sign out").clicked() {
            self.sign_out();
        }
    }

    fn draw_settings(&mut self, ui: &mut egui::Ui) {
        ui.heading(egui::RichText::new("⚙ Settings").size(18.0));
        ui.separator();
        ui.label(egui::RichText::new(format!("API: {}", self.api.base_url())).weak());
        ui.add_space(8.0);

        ui.group(|g| {
            g.vertical(|ui| {
                ui.label(egui::RichText::new("Change password").strong());
                ui.add(
                    egui::TextEdit::singleline(&mut self.current_password)
                        .password(true)
                        .hint_text("Current password"),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut self.new_password)
                        .password(true)
                        .hint_text("New password"),
                );
                if ui.button("Update password").clicked() {
                    self.change_password();
                }
            });
        });

        ui.add_space(8.0);
        ui.group(|g| {
            g.vertical(|ui| {
                ui.label(egui::RichText::new("Delete account").strong().color(ERROR_COLOR));
                ui.checkbox(&mut self.confirm_delete, "I understand this cannot be undone");
                if ui
                    .add_enabled(self.confirm_delete, egui::Button::new("Delete my account"))
                    .clicked()
                {
                    self.delete_account();
                }
            });
        });
    }

    fn change_password(&mut self) {
        if self.new_password.len() < 8 {
            self.feedback = Some((false, "New password must be at least 8 characters.".to_string()));
            return;
        }
        let token = match self.session.require_token() {
            Ok(token) => token,
            Err(err) => return self.handle_error(err),
        };
        let api = self.api.clone();
        let current = self.current_password.clone();
        let new = self.new_password.clone();
        self.spawn(async move {
            UiEvent::Account {
                action: AccountAction::ChangePassword,
                result: api.change_password(&token, &current, &new).await,
            }
        });
    }

    fn delete_account(&mut self) {
        let token = match self.session.require_token() {
            Ok(token) => token,
            Err(err) => return self.handle_error(err),
        };
        let api = self.api.clone();
        self.spawn(async move {
            UiEvent::Account {
                action: AccountAction::DeleteAccount,
                result: api.delete_account(&token).await,
            }
        });
    }

    fn draw_sign_in(&mut self, ui: &mut egui::Ui) {
        ui.heading(egui::RichText::new("Sign in to Libby Bot").size(20.0));
        ui.separator();

        ui.group(|g| {
            g.vertical(|ui| {
                ui.label(egui::RichText::new("Library account").strong());
                ui.add(egui::TextEdit::singleline(&mut self.email).hint_text("Email"));
                ui.add(
                    egui::TextEdit::singleline(&mut self.password)
                        .password(true)
                        .hint_text("Password"),
                );
                let ready = !self.email.trim().is_empty() && !self.password.is_empty();
                if ui
                    .add_enabled(ready && !self.signing_in, egui::Button::new("Sign in"))
                    .clicked()
                {
                    self.signing_in = true;
                    let api = self.api.clone();
                    let email = self.email.trim().to_string();
                    let password = self.password.clone();
                    self.spawn(async move { UiEvent::LoggedIn(api.login(&email, &password).await) });
                }
                if self.signing_in {
                    ui.spinner();
                }
            });
        });

        ui.add_space(8.0);
        ui.group(|g| {
            g.vertical(|ui| {
                ui.label(egui::RichText::new("Local profile").strong());
                ui.label(
                    egui::RichText::new("Keeps your wishlist on this device only.")
                        .weak()
                        .size(12.0),
                );
                ui.add(egui::TextEdit::singleline(&mut self.local_name).hint_text("Your name"));
                if ui
                    .add_enabled(
                        !self.local_name.trim().is_empty(),
                        egui::Button::new("Continue"),
                    )
                    .clicked()
                {
                    let name = self.local_name.trim().to_string();
                    let user = User {
                        id: format!("local-{}", name.to_lowercase().replace(' ', "-")),
                        display_name: name,
                        ..Default::default()
                    };
                    match self.session.sign_in(user, None) {
                        Ok(()) => self.after_sign_in(),
                        Err(err) => self.handle_error(err),
                    }
                }
            });
        });
    }

    fn draw_main_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            feedback_label(ui, &self.feedback);
            match self.current_view.clone() {
                AppView::Discover => self.draw_discover(ui),
                AppView::Search => self.draw_search(ui),
                AppView::Trending => self.draw_trending(ui),
                AppView::Genres => self.draw_genres(ui),
                AppView::BookDetail(book) => self.draw_book_detail(ui, *book),
                AppView::Wishlist => self.draw_wishlist(ui),
                AppView::Onboarding => self.draw_onboarding(ui),
                AppView::Profile => self.draw_profile(ui),
                AppView::Settings => self.draw_settings(ui),
                AppView::SignIn => self.draw_sign_in(ui),
            }
        });
    }
}

fn list_error_message(err: &ApiError) -> String {
    match err {
        ApiError::InvalidData(_) => "Invalid data format received from the server.".to_string(),
        _ => "Could not load books. Please try again later.".to_string(),
    }
}

impl eframe::App for LibbyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_updates();

        self.draw_nav(ctx);
        self.draw_main_content(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_latest_list_request_is_shown() {
        let mut requests = ListRequests::default();
        let trending = requests.begin();
        let search = requests.begin();
        assert!(requests.is_loading());

        assert!(!requests.finish(trending));
        assert!(requests.is_loading());
        assert!(requests.finish(search));
        assert!(!requests.is_loading());
    }

    #[test]
    fn leaving_a_view_drops_its_pending_list() {
        let mut requests = ListRequests::default();
        let trending = requests.begin();
        requests.cancel();

        assert!(!requests.is_loading());
        assert!(!requests.finish(trending));
    }

    #[test]
    fn wrong_current_password_stays_inline() {
        let failure =
            AccountFailure::classify(AccountAction::ChangePassword, ApiError::AuthRequired);
        assert!(matches!(failure, AccountFailure::Inline(ref msg) if msg.contains("incorrect")));
    }

    #[test]
    fn expired_session_on_delete_goes_to_sign_in() {
        match AccountFailure::classify(AccountAction::DeleteAccount, ApiError::AuthRequired) {
            AccountFailure::Escalate(err) => assert!(err.requires_sign_in()),
            other => panic!("unexpected {other:?}"),
        }
        match AccountFailure::classify(
            AccountAction::ChangePassword,
            ApiError::Status {
                status: 500,
                endpoint: "/api/auth/change-password".into(),
            },
        ) {
            AccountFailure::Escalate(err) => assert!(!err.requires_sign_in()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
