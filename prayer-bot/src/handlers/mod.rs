mod logging_handler;

pub use logging_handler::LoggingHandler;
