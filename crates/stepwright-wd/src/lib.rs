pub mod caps;
pub mod session;

pub use session::WebDriverSession;
