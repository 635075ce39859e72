pub mod console;
pub mod dispatcher;

pub use console::ConsoleTransport;
pub use dispatcher::Dispatcher;
