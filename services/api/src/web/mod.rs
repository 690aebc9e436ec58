pub mod generation_task;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers to make them easily accessible
// to the binary that will build the web server router.
pub use rest::{
    create_study_set_handler, delete_study_set_handler, get_study_set_handler,
    list_study_sets_handler, quiz_handler, refine_card_handler, study_card_handler,
    update_study_set_handler,
};
pub use ws_handler::ws_handler;
