pub mod callback_handler;
pub mod dispatcher;

pub use callback_handler::{CallbackError, CallbackRegistry, CustomLogger, LoggedCall};
pub use dispatcher::LoggingDispatcher;
