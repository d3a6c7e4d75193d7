pub mod catalog;
pub mod fetch;
pub mod import;
pub mod logging;
pub mod record;

pub mod util {
    pub mod env;
}
