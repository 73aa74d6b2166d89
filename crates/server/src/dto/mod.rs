mod route;
mod stop_time;

pub use route::*;
pub use stop_time::*;
