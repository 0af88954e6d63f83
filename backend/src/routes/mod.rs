//! Route definitions for the Condominium Management Platform

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public, except /me)
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - tenant scoped
        .nest("/condominiums", condominium_routes(state.clone()))
        // Protected routes - the caller's inbox
        .nest("/notifications", notification_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .merge(protected)
}

/// Condominium routes (protected)
fn condominium_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_condominiums).post(handlers::create_condominium),
        )
        .route(
            "/:condo_id",
            get(handlers::get_condominium).patch(handlers::update_condominium),
        )
        .route(
            "/:condo_id/settings",
            get(handlers::get_settings).patch(handlers::update_settings),
        )
        .merge(member_routes())
        .merge(announcement_routes())
        .merge(ballot_routes())
        .merge(budget_routes())
        .merge(maintenance_routes())
        .merge(initiative_routes())
        .merge(project_routes())
        .merge(document_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Members, functional titles and roster
fn member_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:condo_id/members",
            get(handlers::list_members).post(handlers::add_member),
        )
        .route(
            "/:condo_id/members/:user_id",
            patch(handlers::update_member).delete(handlers::remove_member),
        )
        .route("/:condo_id/members/:user_id/title", put(handlers::assign_title))
        .route(
            "/:condo_id/titles",
            get(handlers::list_titles).post(handlers::create_title),
        )
        .route(
            "/:condo_id/titles/:title_id",
            delete(handlers::delete_title),
        )
        .route("/:condo_id/roster", get(handlers::roster))
}

fn announcement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:condo_id/announcements",
            get(handlers::list_announcements).post(handlers::create_announcement),
        )
        .route(
            "/:condo_id/announcements/:announcement_id",
            get(handlers::get_announcement)
                .patch(handlers::update_announcement)
                .delete(handlers::delete_announcement),
        )
}

fn ballot_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:condo_id/ballots",
            get(handlers::list_ballots).post(handlers::create_ballot),
        )
        .route("/:condo_id/ballots/:ballot_id", get(handlers::get_ballot))
        .route("/:condo_id/ballots/:ballot_id/open", post(handlers::open_ballot))
        .route("/:condo_id/ballots/:ballot_id/close", post(handlers::close_ballot))
        .route("/:condo_id/ballots/:ballot_id/votes", post(handlers::cast_vote))
        .route("/:condo_id/ballots/:ballot_id/results", get(handlers::ballot_results))
        .route("/:condo_id/ballots/:ballot_id/export", get(handlers::export_ballot))
}

fn budget_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:condo_id/budget",
            get(handlers::list_budget_items).post(handlers::create_budget_item),
        )
        .route("/:condo_id/budget/summary", get(handlers::budget_summary))
        .route("/:condo_id/budget/export", get(handlers::export_budget))
        .route(
            "/:condo_id/budget/:item_id",
            patch(handlers::update_budget_item).delete(handlers::delete_budget_item),
        )
}

fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:condo_id/maintenance",
            get(handlers::list_requests).post(handlers::create_request),
        )
        .route(
            "/:condo_id/maintenance/:request_id",
            get(handlers::get_request).patch(handlers::update_request),
        )
}

fn initiative_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:condo_id/initiatives",
            get(handlers::list_initiatives).post(handlers::propose_initiative),
        )
        .route(
            "/:condo_id/initiatives/:initiative_id",
            get(handlers::get_initiative),
        )
        .route(
            "/:condo_id/initiatives/:initiative_id/support",
            post(handlers::support_initiative).delete(handlers::withdraw_support),
        )
        .route(
            "/:condo_id/initiatives/:initiative_id/status",
            put(handlers::decide_initiative),
        )
        .route(
            "/:condo_id/initiatives/:initiative_id/promote",
            post(handlers::promote_initiative),
        )
}

fn project_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:condo_id/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route("/:condo_id/projects/:project_id", get(handlers::get_project))
        .route(
            "/:condo_id/projects/:project_id/advance",
            post(handlers::advance_project),
        )
        .route(
            "/:condo_id/projects/:project_id/updates",
            get(handlers::list_project_updates).post(handlers::post_project_update),
        )
}

fn document_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:condo_id/folders",
            get(handlers::list_folders).post(handlers::create_folder),
        )
        .route(
            "/:condo_id/folders/:folder_id",
            delete(handlers::delete_folder),
        )
        .route(
            "/:condo_id/documents",
            get(handlers::list_documents).post(handlers::register_document),
        )
        .route(
            "/:condo_id/documents/:document_id",
            delete(handlers::delete_document),
        )
        .route(
            "/:condo_id/documents/:document_id/download",
            get(handlers::download_document),
        )
}

/// Notification routes (protected)
fn notification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/unread-count", get(handlers::unread_count))
        .route("/read-all", post(handlers::mark_all_read))
        .route("/:notification_id/read", post(handlers::mark_read))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
