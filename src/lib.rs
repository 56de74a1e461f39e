use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::path::PathBuf;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

pub mod auth;
pub mod blocks;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod media;
pub mod models;
pub mod query;
pub mod repositories;
pub mod response;
pub mod slug;
pub mod store;
pub mod utils;

use auth::JwtKeys;
use config::AppConfig;
use handlers::{
    auth_handlers::{
        forgot_password_handler, login_handler, me_handler, register_handler,
        reset_password_handler, verify_email_handler,
    },
    block_handlers::{delete_block_handler, upload_block_media_handler, upsert_block_handler},
    category_handlers::{
        create_category_handler, delete_category_handler, get_category_handler,
        list_categories_handler, list_posts_in_category_handler, update_category_handler,
    },
    comment_handlers::{
        add_comment_handler, delete_comment_handler, list_comments_handler,
        report_comment_handler, update_comment_handler,
    },
    post_handlers::{
        comment_stats_handler, create_post_handler, delete_post_handler, get_post_handler,
        init_comment_section_handler, list_posts_handler, toggle_comments_handler,
        update_post_handler,
    },
};
use mailer::Mailer;
use media::LocalMediaStorage;
use store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub media: LocalMediaStorage,
    pub mailer: Mailer,
    pub jwt: JwtKeys,
    pub config: AppConfig,
}

pub fn create_router(store: Store, config: AppConfig) -> Router {
    let app_state = AppState {
        store,
        media: LocalMediaStorage::new(config.upload_dir.clone(), config.media_base_url.clone()),
        mailer: Mailer::new(config.mail.clone()),
        jwt: JwtKeys::new(&config.jwt_secret, config.jwt_expiry_hours),
        config,
    };

    let static_service = ServeDir::new(PathBuf::from(&app_state.config.upload_dir));

    // 20MB, sized for media uploads
    const MAX_BODY_SIZE: usize = 20 * 1024 * 1024;

    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/me", get(me_handler))
        .route("/auth/verify/:token", get(verify_email_handler))
        .route("/auth/forgot-password", post(forgot_password_handler))
        .route("/auth/reset-password/:token", put(reset_password_handler))
        .route("/posts", get(list_posts_handler).post(create_post_handler))
        .route(
            "/posts/:id",
            get(get_post_handler)
                .put(update_post_handler)
                .delete(delete_post_handler),
        )
        .route("/posts/:id/comments/toggle", patch(toggle_comments_handler))
        .route("/posts/:id/comments/stats", get(comment_stats_handler))
        .route("/posts/:id/comments/init", post(init_comment_section_handler))
        .route("/posts/:id/blocks", put(upsert_block_handler))
        .route("/posts/:id/blocks/:block_id", delete(delete_block_handler))
        .route(
            "/posts/:id/blocks/:block_id/media",
            put(upload_block_media_handler),
        )
        .route(
            "/posts/:id/blocks/:block_id/comments",
            get(list_comments_handler).post(add_comment_handler),
        )
        .route(
            "/comments/:id",
            put(update_comment_handler).delete(delete_comment_handler),
        )
        .route("/comments/:id/report", post(report_comment_handler))
        .route(
            "/categories",
            post(create_category_handler).get(list_categories_handler),
        )
        .route(
            "/categories/:id",
            get(get_category_handler)
                .put(update_category_handler)
                .delete(delete_category_handler),
        )
        .route("/categories/:id/posts", get(list_posts_in_category_handler))
        .nest_service(&app_state.config.media_base_url, static_service)
        .with_state(app_state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
}
