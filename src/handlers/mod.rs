pub mod auth_handlers;
pub mod block_handlers;
pub mod category_handlers;
pub mod comment_handlers;
pub mod post_handlers;
